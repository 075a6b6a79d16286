//! Shader sources for tests.
//!
//! All fragment shaders pair with [`VERTEX_SHADER`], linked with [`ATTRIBUTES`].

/// Passes positions through as normalized device coordinates
pub const VERTEX_SHADER: &str = "attribute vec2 position;
attribute vec2 tex_coord;
varying vec2 v_tex_coord;

void main() {
    v_tex_coord = tex_coord;
    gl_Position = vec4(position, 0.0, 1.0);
}
";

/// Attribute names of [`VERTEX_SHADER`], in index order
pub const ATTRIBUTES: [&str; 2] = ["position", "tex_coord"];

/// A fragment shader filling every fragment with a constant color
pub fn shader_program_fill(r: u8, g: u8, b: u8, a: u8) -> String {
    let [r, g, b, a] = [r, g, b, a].map(|c| c as f64 / 255.0);
    format!(
        "precision mediump float;

void main() {{
    gl_FragColor = vec4({:.9}, {:.9}, {:.9}, {:.9});
}}
",
        r, g, b, a
    )
}

/// A fragment shader summing `num_images` textures, bound to uniforms `image0`, `image1`, ...
///
/// # Panics
///
/// If `num_images` is zero.
pub fn shader_program_images(num_images: usize) -> String {
    assert!(num_images >= 1, "testing: num_images must be >= 1");

    let uniforms: String = (0..num_images)
        .map(|i| format!("uniform sampler2D image{};\n", i))
        .collect();
    let sum = (0..num_images)
        .map(|i| format!("texture2D(image{}, v_tex_coord)", i))
        .collect::<Vec<_>>()
        .join(" + ");
    format!(
        "precision mediump float;

{}varying vec2 v_tex_coord;

void main() {{
    gl_FragColor = {};
}}
",
        uniforms, sum
    )
}
