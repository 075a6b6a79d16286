//! [`Driver`] implementation over GL entry points resolved at runtime.

use std::{
    ffi::{CStr, CString},
    fmt,
    os::raw::{c_char, c_void},
    ptr,
    rc::Rc,
};

use libloading::Library;
use tracing::{debug, warn};

use super::{
    ffi::{
        self,
        types::{GLenum, GLint, GLuint},
    },
    Driver,
};
use crate::context::{contract_violation, ContractViolation, GlError};

/// Library names tried by [`GlesDriver::from_system_library`], in order.
pub const DEFAULT_LIBRARIES: &[&str] = &["libGLESv2.so.2", "libGLESv2.so", "libGL.so.1"];

type Loader = Box<dyn FnMut(&str) -> *const c_void>;

/// A [`Driver`] calling straight into the platform's GL implementation.
pub struct GlesDriver {
    gl: ffi::Gles2,
    loader: Loader,
    _not_send: *mut (),
}

impl fmt::Debug for GlesDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ffi::Gles2 does not implement Debug
        f.debug_struct("GlesDriver").finish_non_exhaustive()
    }
}

impl GlesDriver {
    /// Creates a driver resolving GL symbols through `loader`.
    ///
    /// No symbol is resolved before [`Driver::load_functions`] runs, which
    /// [`GraphicsContext::reset`](crate::context::GraphicsContext::reset) does on first use.
    ///
    /// # Safety
    ///
    /// The GL context the symbols belong to must be current on the calling thread whenever this
    /// driver is used, and stay alive for as long as the driver.
    pub unsafe fn new<F>(loader: F) -> GlesDriver
    where
        F: FnMut(&str) -> *const c_void + 'static,
    {
        GlesDriver {
            gl: ffi::Gles2::load_with(|_| ptr::null()),
            loader: Box::new(loader),
            _not_send: ptr::null_mut(),
        }
    }

    /// Creates a driver resolving GL symbols from the shared library `name`.
    ///
    /// # Safety
    ///
    /// Same requirements as [`GlesDriver::new`]. Additionally, loading the library runs its
    /// initialization routines.
    pub unsafe fn from_library(name: &str) -> Result<GlesDriver, GlError> {
        let library = Rc::new(Library::new(name).map_err(GlError::LibraryLoad)?);
        debug!(library = name, "Opened GL library");
        Ok(GlesDriver::new(move |sym| {
            let Ok(name) = CString::new(sym) else {
                return ptr::null();
            };
            match unsafe { library.get::<*const c_void>(name.as_bytes_with_nul()) } {
                Ok(symbol) => *symbol,
                Err(_) => ptr::null(),
            }
        }))
    }

    /// Tries every library of [`DEFAULT_LIBRARIES`] and uses the first one that opens.
    ///
    /// # Safety
    ///
    /// See [`GlesDriver::from_library`].
    pub unsafe fn from_system_library() -> Result<GlesDriver, GlError> {
        let mut result = Err(GlError::FunctionLoad("no GL library to open"));
        for name in DEFAULT_LIBRARIES {
            result = GlesDriver::from_library(name);
            match &result {
                Ok(_) => break,
                Err(err) => warn!(library = name, "Failed to open GL library: {}", err),
            }
        }
        result
    }

    /// Access the raw bindings
    ///
    /// # Safety
    ///
    /// State changes made through the raw bindings bypass the bound-state cache of any
    /// [`GraphicsContext`](crate::context::GraphicsContext) using this driver; call its
    /// `reset` afterwards.
    pub unsafe fn raw(&self) -> &ffi::Gles2 {
        &self.gl
    }
}

fn c_name(name: &str) -> CString {
    CString::new(name).unwrap_or_else(|_| contract_violation(ContractViolation::InteriorNul(name.to_owned())))
}

unsafe fn info_log(
    len: GLint,
    read: impl FnOnce(ffi::types::GLsizei, *mut ffi::types::GLsizei, *mut ffi::types::GLchar),
) -> String {
    let mut error = Vec::<u8>::with_capacity(len.max(0) as usize);
    let mut written = 0;
    read(len, &mut written as *mut _, error.as_mut_ptr() as *mut _);
    error.set_len(written.clamp(0, len.max(0)) as usize);
    String::from_utf8_lossy(&error).into_owned()
}

impl Driver for GlesDriver {
    fn load_functions(&mut self) -> Result<(), GlError> {
        let loader: &mut dyn FnMut(&str) -> *const c_void = &mut *self.loader;
        let gl = ffi::Gles2::load_with(|sym| loader(sym));

        let required = [
            ("glGetString", gl.GetString.is_loaded()),
            ("glGetIntegerv", gl.GetIntegerv.is_loaded()),
            ("glBindFramebuffer", gl.BindFramebuffer.is_loaded()),
            ("glBindTexture", gl.BindTexture.is_loaded()),
            ("glBlendFuncSeparate", gl.BlendFuncSeparate.is_loaded()),
            ("glBlendEquationSeparate", gl.BlendEquationSeparate.is_loaded()),
            ("glCreateShader", gl.CreateShader.is_loaded()),
            ("glLinkProgram", gl.LinkProgram.is_loaded()),
            ("glDrawElements", gl.DrawElements.is_loaded()),
            ("glReadPixels", gl.ReadPixels.is_loaded()),
        ];
        if let Some((name, _)) = required.iter().find(|(_, loaded)| !loaded) {
            return Err(GlError::FunctionLoad(*name));
        }

        self.gl = gl;
        Ok(())
    }

    fn get_string(&mut self, name: GLenum) -> String {
        unsafe {
            let ptr = self.gl.GetString(name) as *const c_char;
            if ptr.is_null() {
                return String::new();
            }
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        }
    }

    fn get_integer(&mut self, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { self.gl.GetIntegerv(pname, &mut value as *mut _) };
        value
    }

    fn get_error(&mut self) -> GLenum {
        unsafe { self.gl.GetError() }
    }

    fn get_shader_precision_format(&mut self, shader_type: GLenum, precision_type: GLenum) -> GLint {
        let mut range = [0; 2];
        let mut precision = 0;
        unsafe {
            self.gl.GetShaderPrecisionFormat(
                shader_type,
                precision_type,
                range.as_mut_ptr(),
                &mut precision as *mut _,
            )
        };
        precision
    }

    fn enable(&mut self, cap: GLenum) {
        unsafe { self.gl.Enable(cap) }
    }

    fn disable(&mut self, cap: GLenum) {
        unsafe { self.gl.Disable(cap) }
    }

    fn blend_func_separate(
        &mut self,
        src_rgb: GLenum,
        dst_rgb: GLenum,
        src_alpha: GLenum,
        dst_alpha: GLenum,
    ) {
        unsafe { self.gl.BlendFuncSeparate(src_rgb, dst_rgb, src_alpha, dst_alpha) }
    }

    fn blend_equation_separate(&mut self, mode_rgb: GLenum, mode_alpha: GLenum) {
        unsafe { self.gl.BlendEquationSeparate(mode_rgb, mode_alpha) }
    }

    fn scissor(&mut self, x: GLint, y: GLint, width: GLint, height: GLint) {
        unsafe { self.gl.Scissor(x, y, width, height) }
    }

    fn viewport(&mut self, x: GLint, y: GLint, width: GLint, height: GLint) {
        unsafe { self.gl.Viewport(x, y, width, height) }
    }

    fn flush(&mut self) {
        unsafe { self.gl.Flush() }
    }

    fn clear(&mut self, mask: GLenum) {
        unsafe { self.gl.Clear(mask) }
    }

    fn color_mask(&mut self, red: bool, green: bool, blue: bool, alpha: bool) {
        unsafe { self.gl.ColorMask(red as u8, green as u8, blue as u8, alpha as u8) }
    }

    fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint) {
        unsafe { self.gl.StencilFunc(func, reference, mask) }
    }

    fn stencil_op(&mut self, sfail: GLenum, dpfail: GLenum, dppass: GLenum) {
        unsafe { self.gl.StencilOp(sfail, dpfail, dppass) }
    }

    fn create_texture(&mut self) -> GLuint {
        let mut tex = 0;
        unsafe { self.gl.GenTextures(1, &mut tex) };
        tex
    }

    fn active_texture(&mut self, unit: GLenum) {
        unsafe { self.gl.ActiveTexture(unit) }
    }

    fn bind_texture(&mut self, target: GLenum, texture: GLuint) {
        unsafe { self.gl.BindTexture(target, texture) }
    }

    fn is_texture(&mut self, texture: GLuint) -> bool {
        unsafe { self.gl.IsTexture(texture) == ffi::TRUE }
    }

    fn delete_texture(&mut self, texture: GLuint) {
        unsafe { self.gl.DeleteTextures(1, &texture) }
    }

    fn tex_parameteri(&mut self, target: GLenum, pname: GLenum, param: GLint) {
        unsafe { self.gl.TexParameteri(target, pname, param) }
    }

    fn pixel_storei(&mut self, pname: GLenum, param: GLint) {
        unsafe { self.gl.PixelStorei(pname, param) }
    }

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
    ) {
        let data = pixels.map_or(ptr::null(), |p| p.as_ptr() as *const c_void);
        unsafe {
            self.gl
                .TexImage2D(target, level, internal_format, width, height, 0, format, type_, data)
        }
    }

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
    ) {
        unsafe {
            self.gl.TexSubImage2D(
                target,
                level,
                x,
                y,
                width,
                height,
                format,
                type_,
                pixels.as_ptr() as *const c_void,
            )
        }
    }

    fn create_renderbuffer(&mut self) -> GLuint {
        let mut rbo = 0;
        unsafe { self.gl.GenRenderbuffers(1, &mut rbo) };
        rbo
    }

    fn bind_renderbuffer(&mut self, target: GLenum, renderbuffer: GLuint) {
        unsafe { self.gl.BindRenderbuffer(target, renderbuffer) }
    }

    fn is_renderbuffer(&mut self, renderbuffer: GLuint) -> bool {
        unsafe { self.gl.IsRenderbuffer(renderbuffer) == ffi::TRUE }
    }

    fn delete_renderbuffer(&mut self, renderbuffer: GLuint) {
        unsafe { self.gl.DeleteRenderbuffers(1, &renderbuffer) }
    }

    fn renderbuffer_storage(&mut self, target: GLenum, internal_format: GLenum, width: GLint, height: GLint) {
        unsafe { self.gl.RenderbufferStorage(target, internal_format, width, height) }
    }

    fn create_framebuffer(&mut self) -> GLuint {
        let mut fbo = 0;
        unsafe { self.gl.GenFramebuffers(1, &mut fbo) };
        fbo
    }

    fn bind_framebuffer(&mut self, target: GLenum, framebuffer: GLuint) {
        unsafe { self.gl.BindFramebuffer(target, framebuffer) }
    }

    fn is_framebuffer(&mut self, framebuffer: GLuint) -> bool {
        unsafe { self.gl.IsFramebuffer(framebuffer) == ffi::TRUE }
    }

    fn delete_framebuffer(&mut self, framebuffer: GLuint) {
        unsafe { self.gl.DeleteFramebuffers(1, &framebuffer) }
    }

    fn framebuffer_texture_2d(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        tex_target: GLenum,
        texture: GLuint,
        level: GLint,
    ) {
        unsafe {
            self.gl
                .FramebufferTexture2D(target, attachment, tex_target, texture, level)
        }
    }

    fn framebuffer_renderbuffer(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        rb_target: GLenum,
        renderbuffer: GLuint,
    ) {
        unsafe {
            self.gl
                .FramebufferRenderbuffer(target, attachment, rb_target, renderbuffer)
        }
    }

    fn check_framebuffer_status(&mut self, target: GLenum) -> GLenum {
        unsafe { self.gl.CheckFramebufferStatus(target) }
    }

    fn read_pixels(
        &mut self,
        dst: Option<&mut [u8]>,
        x: GLint,
        y: GLint,
        width: GLint,
        height: GLint,
        format: GLenum,
        type_: GLenum,
    ) {
        let data = dst.map_or(ptr::null_mut(), |d| d.as_mut_ptr() as *mut c_void);
        unsafe { self.gl.ReadPixels(x, y, width, height, format, type_, data) }
    }

    fn create_shader(&mut self, shader_type: GLenum) -> GLuint {
        unsafe { self.gl.CreateShader(shader_type) }
    }

    fn shader_source(&mut self, shader: GLuint, source: &str) {
        unsafe {
            self.gl.ShaderSource(
                shader,
                1,
                &source.as_ptr() as *const *const u8 as *const *const ffi::types::GLchar,
                &(source.len() as i32) as *const _,
            )
        }
    }

    fn compile_shader(&mut self, shader: GLuint) {
        unsafe { self.gl.CompileShader(shader) }
    }

    fn get_shaderi(&mut self, shader: GLuint, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { self.gl.GetShaderiv(shader, pname, &mut value as *mut _) };
        value
    }

    fn get_shader_info_log(&mut self, shader: GLuint) -> String {
        let len = self.get_shaderi(shader, ffi::INFO_LOG_LENGTH);
        let gl = &self.gl;
        unsafe {
            info_log(len, |max, written, buf| {
                gl.GetShaderInfoLog(shader, max, written, buf);
            })
        }
    }

    fn delete_shader(&mut self, shader: GLuint) {
        unsafe { self.gl.DeleteShader(shader) }
    }

    fn create_program(&mut self) -> GLuint {
        unsafe { self.gl.CreateProgram() }
    }

    fn attach_shader(&mut self, program: GLuint, shader: GLuint) {
        unsafe { self.gl.AttachShader(program, shader) }
    }

    fn bind_attrib_location(&mut self, program: GLuint, index: GLuint, name: &str) {
        let name = c_name(name);
        unsafe { self.gl.BindAttribLocation(program, index, name.as_ptr()) }
    }

    fn link_program(&mut self, program: GLuint) {
        unsafe { self.gl.LinkProgram(program) }
    }

    fn get_programi(&mut self, program: GLuint, pname: GLenum) -> GLint {
        let mut value = 0;
        unsafe { self.gl.GetProgramiv(program, pname, &mut value as *mut _) };
        value
    }

    fn get_program_info_log(&mut self, program: GLuint) -> String {
        let len = self.get_programi(program, ffi::INFO_LOG_LENGTH);
        let gl = &self.gl;
        unsafe {
            info_log(len, |max, written, buf| {
                gl.GetProgramInfoLog(program, max, written, buf);
            })
        }
    }

    fn use_program(&mut self, program: GLuint) {
        unsafe { self.gl.UseProgram(program) }
    }

    fn is_program(&mut self, program: GLuint) -> bool {
        unsafe { self.gl.IsProgram(program) == ffi::TRUE }
    }

    fn delete_program(&mut self, program: GLuint) {
        unsafe { self.gl.DeleteProgram(program) }
    }

    fn get_uniform_location(&mut self, program: GLuint, name: &str) -> GLint {
        let name = c_name(name);
        unsafe { self.gl.GetUniformLocation(program, name.as_ptr()) }
    }

    fn get_attrib_location(&mut self, program: GLuint, name: &str) -> GLint {
        let name = c_name(name);
        unsafe { self.gl.GetAttribLocation(program, name.as_ptr()) }
    }

    fn uniform_1i(&mut self, location: GLint, v: GLint) {
        unsafe { self.gl.Uniform1i(location, v) }
    }

    fn uniform_1iv(&mut self, location: GLint, v: &[i32]) {
        unsafe { self.gl.Uniform1iv(location, v.len() as i32, v.as_ptr()) }
    }

    fn uniform_1fv(&mut self, location: GLint, v: &[f32]) {
        unsafe { self.gl.Uniform1fv(location, v.len() as i32, v.as_ptr()) }
    }

    fn uniform_2fv(&mut self, location: GLint, v: &[f32]) {
        unsafe { self.gl.Uniform2fv(location, (v.len() / 2) as i32, v.as_ptr()) }
    }

    fn uniform_3fv(&mut self, location: GLint, v: &[f32]) {
        unsafe { self.gl.Uniform3fv(location, (v.len() / 3) as i32, v.as_ptr()) }
    }

    fn uniform_4fv(&mut self, location: GLint, v: &[f32]) {
        unsafe { self.gl.Uniform4fv(location, (v.len() / 4) as i32, v.as_ptr()) }
    }

    fn uniform_matrix_2fv(&mut self, location: GLint, v: &[f32]) {
        unsafe {
            self.gl
                .UniformMatrix2fv(location, (v.len() / 4) as i32, ffi::FALSE, v.as_ptr())
        }
    }

    fn uniform_matrix_3fv(&mut self, location: GLint, v: &[f32]) {
        unsafe {
            self.gl
                .UniformMatrix3fv(location, (v.len() / 9) as i32, ffi::FALSE, v.as_ptr())
        }
    }

    fn uniform_matrix_4fv(&mut self, location: GLint, v: &[f32]) {
        unsafe {
            self.gl
                .UniformMatrix4fv(location, (v.len() / 16) as i32, ffi::FALSE, v.as_ptr())
        }
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: GLuint,
        size: GLint,
        type_: GLenum,
        normalized: bool,
        stride: GLint,
        offset: usize,
    ) {
        unsafe {
            self.gl.VertexAttribPointer(
                index,
                size,
                type_,
                normalized as u8,
                stride,
                offset as *const c_void,
            )
        }
    }

    fn enable_vertex_attrib_array(&mut self, index: GLuint) {
        unsafe { self.gl.EnableVertexAttribArray(index) }
    }

    fn disable_vertex_attrib_array(&mut self, index: GLuint) {
        unsafe { self.gl.DisableVertexAttribArray(index) }
    }

    fn create_buffer(&mut self) -> GLuint {
        let mut buffer = 0;
        unsafe { self.gl.GenBuffers(1, &mut buffer) };
        buffer
    }

    fn bind_buffer(&mut self, target: GLenum, buffer: GLuint) {
        unsafe { self.gl.BindBuffer(target, buffer) }
    }

    fn buffer_init(&mut self, target: GLenum, size: usize, usage: GLenum) {
        unsafe { self.gl.BufferData(target, size as isize, ptr::null(), usage) }
    }

    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]) {
        unsafe {
            self.gl.BufferSubData(
                target,
                offset as isize,
                data.len() as isize,
                data.as_ptr() as *const c_void,
            )
        }
    }

    fn get_buffer_size(&mut self, target: GLenum) -> usize {
        let mut size = 0;
        unsafe { self.gl.GetBufferParameteriv(target, ffi::BUFFER_SIZE, &mut size) };
        size.max(0) as usize
    }

    fn get_buffer_sub_data(&mut self, target: GLenum, offset: usize, dst: &mut [u8]) -> Result<(), GlError> {
        unsafe {
            let mapping = self
                .gl
                .MapBufferRange(target, offset as isize, dst.len() as isize, ffi::MAP_READ_BIT);
            if mapping.is_null() {
                return Err(GlError::MapBuffer(self.gl.GetError()));
            }
            ptr::copy_nonoverlapping(mapping as *const u8, dst.as_mut_ptr(), dst.len());
            self.gl.UnmapBuffer(target);
        }
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: GLuint) {
        unsafe { self.gl.DeleteBuffers(1, &buffer) }
    }

    fn draw_elements(&mut self, mode: GLenum, count: GLint, type_: GLenum, offset: usize) {
        unsafe {
            self.gl
                .DrawElements(mode, count, type_, offset as *const c_void)
        }
    }
}
