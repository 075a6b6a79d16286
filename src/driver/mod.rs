//! The immediate-mode GL surface [`GraphicsContext`](crate::context::GraphicsContext) talks to.
//!
//! [`Driver`] is intentionally a flat mirror of the handful of GL entry points the context
//! needs. Implementations do no caching of their own; all redundant-call elimination happens
//! one layer up.
//!
//! - [`GlesDriver`](gles::GlesDriver) forwards to GL entry points resolved at runtime
//!   (requires the `renderer_gl` feature).
//! - [`RecordingDriver`](test::RecordingDriver) counts calls and rasterizes into memory,
//!   which is what the test-suite runs against (requires the `renderer_test` feature).

use crate::context::GlError;

#[cfg(feature = "renderer_gl")]
pub mod gles;
#[cfg(any(test, feature = "renderer_test"))]
pub mod test;

/// Raw GL bindings and constants generated at build time.
#[allow(clippy::all, missing_docs, missing_debug_implementations)]
pub mod ffi {
    include!(concat!(env!("OUT_DIR"), "/gl_bindings.rs"));
}

use ffi::types::{GLenum, GLint, GLuint};

/// Downstream GL API surface.
///
/// Object names follow GL conventions: `0` is never a valid object returned by a `create_*`
/// call and signals failure.
pub trait Driver {
    /// Resolves the GL function table.
    ///
    /// Called at most once successfully per driver; may be retried after a failure.
    fn load_functions(&mut self) -> Result<(), GlError>;

    /// `glGetString`, empty if the driver returned nothing
    fn get_string(&mut self, name: GLenum) -> String;
    /// `glGetIntegerv` for a single value
    fn get_integer(&mut self, pname: GLenum) -> GLint;
    /// `glGetError`
    fn get_error(&mut self) -> GLenum;
    /// `glGetShaderPrecisionFormat`, returning the precision
    fn get_shader_precision_format(&mut self, shader_type: GLenum, precision_type: GLenum) -> GLint;

    /// `glEnable`
    fn enable(&mut self, cap: GLenum);
    /// `glDisable`
    fn disable(&mut self, cap: GLenum);
    /// `glBlendFuncSeparate`
    fn blend_func_separate(&mut self, src_rgb: GLenum, dst_rgb: GLenum, src_alpha: GLenum, dst_alpha: GLenum);
    /// `glBlendEquationSeparate`
    fn blend_equation_separate(&mut self, mode_rgb: GLenum, mode_alpha: GLenum);
    /// `glScissor`
    fn scissor(&mut self, x: GLint, y: GLint, width: GLint, height: GLint);
    /// `glViewport`
    fn viewport(&mut self, x: GLint, y: GLint, width: GLint, height: GLint);
    /// `glFlush`
    fn flush(&mut self);
    /// `glClear`
    fn clear(&mut self, mask: GLenum);
    /// `glColorMask`
    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool);
    /// `glStencilFunc`
    fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint);
    /// `glStencilOp`
    fn stencil_op(&mut self, sfail: GLenum, dpfail: GLenum, dppass: GLenum);

    /// `glGenTextures` for one texture
    fn create_texture(&mut self) -> GLuint;
    /// `glActiveTexture`
    fn active_texture(&mut self, unit: GLenum);
    /// `glBindTexture`
    fn bind_texture(&mut self, target: GLenum, texture: GLuint);
    /// `glIsTexture`
    fn is_texture(&mut self, texture: GLuint) -> bool;
    /// `glDeleteTextures` for one texture
    fn delete_texture(&mut self, texture: GLuint);
    /// `glTexParameteri`
    fn tex_parameteri(&mut self, target: GLenum, pname: GLenum, param: GLint);
    /// `glPixelStorei`
    fn pixel_storei(&mut self, pname: GLenum, param: GLint);
    /// `glTexImage2D`; `None` leaves the storage uninitialized
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        internal_format: GLint,
        width: GLint,
        height: GLint,
        format: GLenum,
        type_: GLenum,
        pixels: Option<&[u8]>,
    );
    /// `glTexSubImage2D`
    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image_2d(
        &mut self,
        target: GLenum,
        level: GLint,
        x: GLint,
        y: GLint,
        width: GLint,
        height: GLint,
        format: GLenum,
        type_: GLenum,
        pixels: &[u8],
    );

    /// `glGenRenderbuffers` for one renderbuffer
    fn create_renderbuffer(&mut self) -> GLuint;
    /// `glBindRenderbuffer`
    fn bind_renderbuffer(&mut self, target: GLenum, renderbuffer: GLuint);
    /// `glIsRenderbuffer`
    fn is_renderbuffer(&mut self, renderbuffer: GLuint) -> bool;
    /// `glDeleteRenderbuffers` for one renderbuffer
    fn delete_renderbuffer(&mut self, renderbuffer: GLuint);
    /// `glRenderbufferStorage`
    fn renderbuffer_storage(&mut self, target: GLenum, internal_format: GLenum, width: GLint, height: GLint);

    /// `glGenFramebuffers` for one framebuffer
    fn create_framebuffer(&mut self) -> GLuint;
    /// `glBindFramebuffer`
    fn bind_framebuffer(&mut self, target: GLenum, framebuffer: GLuint);
    /// `glIsFramebuffer`
    fn is_framebuffer(&mut self, framebuffer: GLuint) -> bool;
    /// `glDeleteFramebuffers` for one framebuffer
    fn delete_framebuffer(&mut self, framebuffer: GLuint);
    /// `glFramebufferTexture2D`
    fn framebuffer_texture_2d(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        tex_target: GLenum,
        texture: GLuint,
        level: GLint,
    );
    /// `glFramebufferRenderbuffer`
    fn framebuffer_renderbuffer(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        rb_target: GLenum,
        renderbuffer: GLuint,
    );
    /// `glCheckFramebufferStatus`
    fn check_framebuffer_status(&mut self, target: GLenum) -> GLenum;
    /// `glReadPixels`; `None` reads into the bound pixel pack buffer
    #[allow(clippy::too_many_arguments)]
    fn read_pixels(
        &mut self,
        dst: Option<&mut [u8]>,
        x: GLint,
        y: GLint,
        width: GLint,
        height: GLint,
        format: GLenum,
        type_: GLenum,
    );

    /// `glCreateShader`
    fn create_shader(&mut self, shader_type: GLenum) -> GLuint;
    /// `glShaderSource` with a single source string
    fn shader_source(&mut self, shader: GLuint, source: &str);
    /// `glCompileShader`
    fn compile_shader(&mut self, shader: GLuint);
    /// `glGetShaderiv`
    fn get_shaderi(&mut self, shader: GLuint, pname: GLenum) -> GLint;
    /// `glGetShaderInfoLog`
    fn get_shader_info_log(&mut self, shader: GLuint) -> String;
    /// `glDeleteShader`
    fn delete_shader(&mut self, shader: GLuint);

    /// `glCreateProgram`
    fn create_program(&mut self) -> GLuint;
    /// `glAttachShader`
    fn attach_shader(&mut self, program: GLuint, shader: GLuint);
    /// `glBindAttribLocation`
    fn bind_attrib_location(&mut self, program: GLuint, index: GLuint, name: &str);
    /// `glLinkProgram`
    fn link_program(&mut self, program: GLuint);
    /// `glGetProgramiv`
    fn get_programi(&mut self, program: GLuint, pname: GLenum) -> GLint;
    /// `glGetProgramInfoLog`
    fn get_program_info_log(&mut self, program: GLuint) -> String;
    /// `glUseProgram`
    fn use_program(&mut self, program: GLuint);
    /// `glIsProgram`
    fn is_program(&mut self, program: GLuint) -> bool;
    /// `glDeleteProgram`
    fn delete_program(&mut self, program: GLuint);
    /// `glGetUniformLocation`
    fn get_uniform_location(&mut self, program: GLuint, name: &str) -> GLint;
    /// `glGetAttribLocation`
    fn get_attrib_location(&mut self, program: GLuint, name: &str) -> GLint;

    /// `glUniform1i`
    fn uniform_1i(&mut self, location: GLint, v: GLint);
    /// `glUniform1iv`
    fn uniform_1iv(&mut self, location: GLint, v: &[i32]);
    /// `glUniform1fv`
    fn uniform_1fv(&mut self, location: GLint, v: &[f32]);
    /// `glUniform2fv`
    fn uniform_2fv(&mut self, location: GLint, v: &[f32]);
    /// `glUniform3fv`
    fn uniform_3fv(&mut self, location: GLint, v: &[f32]);
    /// `glUniform4fv`
    fn uniform_4fv(&mut self, location: GLint, v: &[f32]);
    /// `glUniformMatrix2fv`, column major
    fn uniform_matrix_2fv(&mut self, location: GLint, v: &[f32]);
    /// `glUniformMatrix3fv`, column major
    fn uniform_matrix_3fv(&mut self, location: GLint, v: &[f32]);
    /// `glUniformMatrix4fv`, column major
    fn uniform_matrix_4fv(&mut self, location: GLint, v: &[f32]);

    /// `glVertexAttribPointer`
    fn vertex_attrib_pointer(
        &mut self,
        index: GLuint,
        size: GLint,
        type_: GLenum,
        normalized: bool,
        stride: GLint,
        offset: usize,
    );
    /// `glEnableVertexAttribArray`
    fn enable_vertex_attrib_array(&mut self, index: GLuint);
    /// `glDisableVertexAttribArray`
    fn disable_vertex_attrib_array(&mut self, index: GLuint);

    /// `glGenBuffers` for one buffer
    fn create_buffer(&mut self) -> GLuint;
    /// `glBindBuffer`
    fn bind_buffer(&mut self, target: GLenum, buffer: GLuint);
    /// `glBufferData` without initial contents
    fn buffer_init(&mut self, target: GLenum, size: usize, usage: GLenum);
    /// `glBufferSubData`
    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]);
    /// `glGetBufferParameteriv` with `BUFFER_SIZE`
    fn get_buffer_size(&mut self, target: GLenum) -> usize;
    /// Copies the contents of the buffer bound to `target` into `dst`.
    ///
    /// Fails with [`GlError::MapBuffer`] if the buffer cannot be mapped for reading.
    fn get_buffer_sub_data(&mut self, target: GLenum, offset: usize, dst: &mut [u8]) -> Result<(), GlError>;
    /// `glDeleteBuffers` for one buffer
    fn delete_buffer(&mut self, buffer: GLuint);
    /// `glDrawElements`
    fn draw_elements(&mut self, mode: GLenum, count: GLint, type_: GLenum, offset: usize);
}
