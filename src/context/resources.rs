//! Creation and destruction of GPU objects.

use tracing::{debug, error, instrument};

use super::{
    FramebufferNative, GlError, GraphicsContext, Program, RenderbufferNative, Shader, ShaderStage,
    TextureNative,
};
use crate::driver::{ffi, Driver};

impl<D: Driver> GraphicsContext<D> {
    /// Renderbuffer format providing an 8-bit stencil buffer.
    ///
    /// Legacy desktop GL has no stencil-only renderbuffers, so a packed depth-stencil format
    /// is used there.
    pub fn stencil_format(&self) -> ffi::types::GLenum {
        if self.gl_version.es {
            ffi::STENCIL_INDEX8
        } else {
            ffi::DEPTH24_STENCIL8
        }
    }

    /// Creates an RGBA8 texture with uninitialized contents, leaving it bound
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn new_texture(&mut self, width: i32, height: i32) -> Result<TextureNative, GlError> {
        let t = self.driver.create_texture();
        if t == 0 {
            return Err(GlError::CreateTexture);
        }
        let texture = TextureNative(t);
        self.bind_texture(texture);

        self.driver
            .tex_parameteri(ffi::TEXTURE_2D, ffi::TEXTURE_MAG_FILTER, ffi::NEAREST as i32);
        self.driver
            .tex_parameteri(ffi::TEXTURE_2D, ffi::TEXTURE_MIN_FILTER, ffi::NEAREST as i32);
        self.driver
            .tex_parameteri(ffi::TEXTURE_2D, ffi::TEXTURE_WRAP_S, ffi::CLAMP_TO_EDGE as i32);
        self.driver
            .tex_parameteri(ffi::TEXTURE_2D, ffi::TEXTURE_WRAP_T, ffi::CLAMP_TO_EDGE as i32);
        self.driver.pixel_storei(ffi::UNPACK_ALIGNMENT, 4);

        // Contents are always fully overwritten before use, zeroing them would be wasted work.
        self.driver.tex_image_2d(
            ffi::TEXTURE_2D,
            0,
            ffi::RGBA as i32,
            width,
            height,
            ffi::RGBA,
            ffi::UNSIGNED_BYTE,
            None,
        );

        debug!(texture = t, "Created texture");
        Ok(texture)
    }

    /// Creates a stencil renderbuffer, leaving it bound
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn new_renderbuffer(&mut self, width: i32, height: i32) -> Result<RenderbufferNative, GlError> {
        let r = self.driver.create_renderbuffer();
        if r == 0 {
            return Err(GlError::CreateRenderbuffer);
        }
        let renderbuffer = RenderbufferNative(r);
        self.bind_renderbuffer(renderbuffer);

        let format = self.stencil_format();
        self.driver
            .renderbuffer_storage(ffi::RENDERBUFFER, format, width, height);

        debug!(renderbuffer = r, "Created renderbuffer");
        Ok(renderbuffer)
    }

    /// Creates a framebuffer rendering into `texture`, leaving it bound
    #[instrument(level = "debug", parent = &self.span, skip(self))]
    pub fn new_framebuffer(&mut self, texture: TextureNative) -> Result<FramebufferNative, GlError> {
        let f = self.driver.create_framebuffer();
        if f == 0 {
            return Err(GlError::CreateFramebuffer(f));
        }
        let framebuffer = FramebufferNative(f);
        self.bind_framebuffer(framebuffer);

        self.driver.framebuffer_texture_2d(
            ffi::FRAMEBUFFER,
            ffi::COLOR_ATTACHMENT0,
            ffi::TEXTURE_2D,
            texture.0,
            0,
        );
        let status = self.driver.check_framebuffer_status(ffi::FRAMEBUFFER);
        if status != ffi::FRAMEBUFFER_COMPLETE {
            let err = if status != 0 {
                GlError::IncompleteFramebuffer(status)
            } else {
                match self.driver.get_error() {
                    ffi::NO_ERROR => GlError::FramebufferUnknown,
                    e => GlError::FramebufferError(e),
                }
            };
            error!(framebuffer = f, "{}", err);
            return Err(err);
        }

        debug!(framebuffer = f, "Created framebuffer");
        Ok(framebuffer)
    }

    /// Attaches `r` as the stencil buffer of `f`, leaving `f` bound
    pub fn bind_stencil_buffer(
        &mut self,
        f: FramebufferNative,
        r: RenderbufferNative,
    ) -> Result<(), GlError> {
        self.bind_framebuffer(f);

        self.driver
            .framebuffer_renderbuffer(ffi::FRAMEBUFFER, ffi::STENCIL_ATTACHMENT, ffi::RENDERBUFFER, r.0);
        let status = self.driver.check_framebuffer_status(ffi::FRAMEBUFFER);
        if status != ffi::FRAMEBUFFER_COMPLETE {
            return Err(GlError::StencilAttachment(status));
        }
        Ok(())
    }

    /// Compiles a vertex shader
    pub fn new_vertex_shader(&mut self, source: &str) -> Result<Shader, GlError> {
        self.new_shader(ShaderStage::Vertex, source)
    }

    /// Compiles a fragment shader
    pub fn new_fragment_shader(&mut self, source: &str) -> Result<Shader, GlError> {
        self.new_shader(ShaderStage::Fragment, source)
    }

    /// Compiles a shader for `stage`.
    ///
    /// On failure the driver's compile log is returned as is and the shader object is released.
    pub fn new_shader(&mut self, stage: ShaderStage, source: &str) -> Result<Shader, GlError> {
        let s = self.driver.create_shader(stage.gl_type());
        if s == 0 {
            return Err(GlError::CreateShaderObject(stage));
        }

        self.driver.shader_source(s, source);
        self.driver.compile_shader(s);

        if self.driver.get_shaderi(s, ffi::COMPILE_STATUS) == ffi::FALSE as i32 {
            let log = self.driver.get_shader_info_log(s);
            error!(parent: &self.span, ?stage, "[GL] {}", log);
            self.driver.delete_shader(s);
            return Err(GlError::ShaderCompile(log));
        }
        Ok(Shader(s))
    }

    /// Releases a shader object
    pub fn delete_shader(&mut self, s: Shader) {
        self.driver.delete_shader(s.0);
    }

    /// Links `shaders` into a program.
    ///
    /// `attributes[i]` is bound to attribute index `i` before linking, so the vertex layout is
    /// independent of the driver's own allocation.
    pub fn new_program(&mut self, shaders: &[Shader], attributes: &[&str]) -> Result<Program, GlError> {
        let p = self.driver.create_program();
        if p == 0 {
            return Err(GlError::CreateProgram);
        }

        for shader in shaders {
            self.driver.attach_shader(p, shader.0);
        }
        for (i, name) in attributes.iter().enumerate() {
            self.driver.bind_attrib_location(p, i as u32, name);
        }

        self.driver.link_program(p);
        if self.driver.get_programi(p, ffi::LINK_STATUS) == ffi::FALSE as i32 {
            let log = self.driver.get_program_info_log(p);
            error!(parent: &self.span, "[GL] {}", log);
            self.driver.delete_program(p);
            return Err(GlError::ProgramLink(log));
        }

        debug!(parent: &self.span, program = p, "Linked program");
        Ok(Program(p))
    }

    /// Makes `p` the program used by draws
    pub fn use_program(&mut self, p: Program) {
        self.driver.use_program(p.0);
    }

    /// Releases a program and forgets its cached locations
    pub fn delete_program(&mut self, p: Program) {
        self.location_cache.delete_program(p);

        if !self.driver.is_program(p.0) {
            return;
        }
        self.driver.delete_program(p.0);
    }

    /// Whether `t` names a live texture
    pub fn is_texture(&mut self, t: TextureNative) -> bool {
        self.driver.is_texture(t.0)
    }

    /// Releases a texture; unknown names are ignored
    pub fn delete_texture(&mut self, t: TextureNative) {
        if !self.driver.is_texture(t.0) {
            return;
        }
        if self.last_texture == t {
            self.last_texture = TextureNative(0);
        }
        self.driver.delete_texture(t.0);
    }

    /// Releases a renderbuffer; unknown names are ignored
    pub fn delete_renderbuffer(&mut self, r: RenderbufferNative) {
        if !self.driver.is_renderbuffer(r.0) {
            return;
        }
        if self.last_renderbuffer == r {
            self.last_renderbuffer = RenderbufferNative(0);
        }
        self.driver.delete_renderbuffer(r.0);
    }

    /// Releases a framebuffer; unknown names are ignored
    pub fn delete_framebuffer(&mut self, f: FramebufferNative) {
        if !self.driver.is_framebuffer(f.0) {
            return;
        }
        // Deleting the bound framebuffer rebinds the default one.
        if self.last_framebuffer == f {
            self.last_framebuffer = FramebufferNative::INVALID;
            self.last_viewport_width = 0;
            self.last_viewport_height = 0;
        }
        self.driver.delete_framebuffer(f.0);
    }
}
