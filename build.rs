use gl_generator::{Api, Fallbacks, Profile, Registry};
use std::{env, fs::File, path::PathBuf};

fn gl_generate() {
    let dest = PathBuf::from(&env::var("OUT_DIR").unwrap());

    let mut file = File::create(dest.join("gl_bindings.rs")).unwrap();
    Registry::new(
        Api::Gles2,
        (3, 2),
        Profile::Compatibility,
        Fallbacks::None,
        ["GL_OES_packed_depth_stencil"],
    )
    .write_bindings(gl_generator::StructGenerator, &mut file)
    .unwrap();
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    gl_generate();
}
