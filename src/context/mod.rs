//! The bound-state tracking GL context.
//!
//! [`GraphicsContext`] sits between a renderer and a [`Driver`] and remembers what is currently
//! bound, so that requesting a state that is already in effect costs nothing. Every
//! state-changing operation compares against the cached value first and only talks to the
//! driver on a change.
//!
//! The cache is only as good as the assumption that nobody else touches the GL context. Code
//! issuing raw GL calls in between must call [`GraphicsContext::reset`] afterwards, which is
//! also what has to happen whenever the underlying GL context is (re)acquired.
//!
//! ## Lifetime of GPU objects
//!
//! The context hands out plain handles and never frees anything on its own. Every `new_*` has
//! to be paired with the matching `delete_*` by the caller. Deleting an object that is bound
//! invalidates the corresponding cache entry.

use std::{fmt, marker::PhantomData};

use tracing::{debug, info, info_span, instrument, trace, warn};

use crate::driver::{ffi, Driver};

mod blend;
mod draw;
mod error;
mod handles;
mod location;
mod resources;
mod uniform;
mod version;

pub use blend::{Blend, BlendFactor, BlendOperation};
pub use error::{contract_violation, ContractViolation, GlError};
pub use handles::{
    Buffer, Framebuffer, FramebufferNative, Program, RenderbufferNative, Shader, ShaderStage, TextureNative,
    WritePixelsArgs,
};
pub use location::{AttribLocation, UniformLocation};
pub use uniform::{BasicType, UniformType};
pub use version::GlVersion;

use location::LocationCache;

/// GL state-tracking context.
///
/// See the [module documentation](self) for the caching contract.
pub struct GraphicsContext<D: Driver> {
    driver: D,

    location_cache: LocationCache,
    // This might not be framebuffer 0, e.g. on iOS.
    screen_framebuffer: FramebufferNative,
    last_framebuffer: FramebufferNative,
    last_texture: TextureNative,
    last_texture_unit: Option<u32>,
    last_renderbuffer: RenderbufferNative,
    last_viewport_width: i32,
    last_viewport_height: i32,
    last_blend: Option<Blend>,

    gl_version: GlVersion,
    functions_loaded: bool,
    max_texture_size: Option<i32>,
    high_precision: Option<bool>,

    span: tracing::Span,
    _not_send: PhantomData<*mut ()>,
}

impl<D: Driver + fmt::Debug> fmt::Debug for GraphicsContext<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("driver", &self.driver)
            .field("location_cache", &self.location_cache)
            .field("screen_framebuffer", &self.screen_framebuffer)
            .field("last_framebuffer", &self.last_framebuffer)
            .field("last_texture", &self.last_texture)
            .field("last_texture_unit", &self.last_texture_unit)
            .field("last_renderbuffer", &self.last_renderbuffer)
            .field("last_viewport_width", &self.last_viewport_width)
            .field("last_viewport_height", &self.last_viewport_height)
            .field("last_blend", &self.last_blend)
            .field("gl_version", &self.gl_version)
            .field("max_texture_size", &self.max_texture_size)
            .field("high_precision", &self.high_precision)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> GraphicsContext<D> {
    /// Wraps a driver.
    ///
    /// Nothing is sent to the driver until [`reset`](Self::reset) is called, which has to
    /// happen before any other operation.
    pub fn new(driver: D) -> GraphicsContext<D> {
        GraphicsContext {
            driver,
            location_cache: LocationCache::new(),
            screen_framebuffer: FramebufferNative(0),
            last_framebuffer: FramebufferNative::INVALID,
            last_texture: TextureNative(0),
            last_texture_unit: None,
            last_renderbuffer: RenderbufferNative(0),
            last_viewport_width: 0,
            last_viewport_height: 0,
            last_blend: None,
            gl_version: version::GLES_2_0,
            functions_loaded: false,
            max_texture_size: None,
            high_precision: None,
            span: info_span!("gl_context"),
            _not_send: PhantomData,
        }
    }

    /// Re-derives all cached state from scratch.
    ///
    /// Call this on first use and every time the GL context was (re)acquired, e.g. after a
    /// context loss. The GL function table is loaded by the first successful reset; if that
    /// fails the context stays unusable until a later reset succeeds.
    pub fn reset(&mut self) -> Result<(), GlError> {
        let span = self.span.clone();
        let _guard = span.enter();

        if !self.functions_loaded {
            // Loading functions has to wait until the platform's context setup is done.
            self.driver.load_functions()?;
            self.functions_loaded = true;

            let version = self.driver.get_string(ffi::VERSION);
            info!("GL Version: {}", version);
            info!("GL Vendor: {}", self.driver.get_string(ffi::VENDOR));
            info!("GL Renderer: {}", self.driver.get_string(ffi::RENDERER));
            self.gl_version = GlVersion::try_from(version.as_str()).unwrap_or_else(|_| {
                warn!("Failed to detect GL version, defaulting to GLES 2.0");
                version::GLES_2_0
            });
        }

        self.location_cache = LocationCache::new();
        self.last_texture = TextureNative(0);
        self.last_texture_unit = None;
        self.last_framebuffer = FramebufferNative::INVALID;
        self.last_renderbuffer = RenderbufferNative(0);
        self.last_viewport_width = 0;
        self.last_viewport_height = 0;
        self.last_blend = None;

        self.driver.enable(ffi::BLEND);
        self.driver.enable(ffi::SCISSOR_TEST);
        self.blend(Blend::SOURCE_OVER);

        self.screen_framebuffer =
            FramebufferNative(self.driver.get_integer(ffi::FRAMEBUFFER_BINDING) as u32);
        debug!(screen_framebuffer = self.screen_framebuffer.0, "Context reset");
        Ok(())
    }

    /// Binds `t` to `TEXTURE_2D` of the active texture unit, if not bound already
    pub fn bind_texture(&mut self, t: TextureNative) {
        if self.last_texture == t {
            return;
        }
        self.driver.bind_texture(ffi::TEXTURE_2D, t.0);
        self.last_texture = t;
    }

    /// Binds `r` to `RENDERBUFFER`, if not bound already
    pub fn bind_renderbuffer(&mut self, r: RenderbufferNative) {
        if self.last_renderbuffer == r {
            return;
        }
        self.driver.bind_renderbuffer(ffi::RENDERBUFFER, r.0);
        self.last_renderbuffer = r;
    }

    /// Binds `f` to `FRAMEBUFFER`, if not bound already
    pub fn bind_framebuffer(&mut self, f: FramebufferNative) {
        if self.last_framebuffer == f {
            return;
        }
        self.driver.bind_framebuffer(ffi::FRAMEBUFFER, f.0);
        self.last_framebuffer = f;
    }

    /// Binds `f` and sizes the viewport to cover it.
    ///
    /// The viewport call is skipped when the size is unchanged, except for the screen
    /// framebuffer: platforms may alter its viewport between frames (iOS requires a viewport
    /// call every frame), so its size is never remembered. This relies on the screen
    /// framebuffer being the last target drawn to in a frame, making the next call on it the
    /// first one of the following frame.
    #[instrument(level = "trace", parent = &self.span, skip(self))]
    pub fn set_viewport(&mut self, f: &Framebuffer) {
        self.bind_framebuffer(f.native);
        if self.last_viewport_width == f.width && self.last_viewport_height == f.height {
            return;
        }

        // Some drivers misbehave with viewports exceeding the framebuffer, so match it exactly.
        self.driver.viewport(0, 0, f.width, f.height);

        if f.native == self.screen_framebuffer {
            self.last_viewport_width = 0;
            self.last_viewport_height = 0;
        } else {
            self.last_viewport_width = f.width;
            self.last_viewport_height = f.height;
        }
    }

    /// Applies `blend` unless it is already in effect
    pub fn blend(&mut self, blend: Blend) {
        if self.last_blend == Some(blend) {
            return;
        }
        trace!(parent: &self.span, ?blend, "Applying blend");
        self.last_blend = Some(blend);
        self.driver.blend_func_separate(
            blend.src_rgb.gl_factor(),
            blend.dst_rgb.gl_factor(),
            blend.src_alpha.gl_factor(),
            blend.dst_alpha.gl_factor(),
        );
        self.driver
            .blend_equation_separate(blend.op_rgb.gl_equation(), blend.op_alpha.gl_equation());
    }

    /// Restricts drawing to the given rectangle
    pub fn scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.driver.scissor(x, y, width, height);
    }

    /// The platform's default render target, as recorded by the last [`reset`](Self::reset)
    pub fn screen_framebuffer(&self) -> FramebufferNative {
        self.screen_framebuffer
    }

    /// Largest supported texture dimension, queried once per context
    pub fn max_texture_size(&mut self) -> i32 {
        if let Some(size) = self.max_texture_size {
            return size;
        }
        let size = self.driver.get_integer(ffi::MAX_TEXTURE_SIZE);
        debug!(parent: &self.span, size, "Queried max texture size");
        self.max_texture_size = Some(size);
        size
    }

    /// Whether fragment shaders support `highp` floats, queried once per context
    pub fn is_high_precision_supported(&mut self) -> bool {
        if let Some(highp) = self.high_precision {
            return highp;
        }
        // Desktop GL has no precision qualifiers to lack.
        let highp = !self.gl_version.es
            || self
                .driver
                .get_shader_precision_format(ffi::FRAGMENT_SHADER, ffi::HIGH_FLOAT)
                > 0;
        self.high_precision = Some(highp);
        highp
    }

    /// Whether the driver implements OpenGL ES rather than desktop OpenGL
    pub fn is_es(&self) -> bool {
        self.gl_version.es
    }

    /// Version of the GL implementation, known after the first [`reset`](Self::reset)
    pub fn gl_version(&self) -> GlVersion {
        self.gl_version
    }

    /// The wrapped driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The wrapped driver
    ///
    /// State changed directly through the driver is not tracked; call
    /// [`reset`](Self::reset) afterwards.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
