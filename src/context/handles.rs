use crate::driver::ffi::{self, types::GLenum};

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub u32);

        impl $name {
            /// Raw GL object name
            #[inline]
            pub fn raw(self) -> u32 {
                self.0
            }
        }
    };
}

native_handle!(
    /// GL texture object name
    TextureNative
);
native_handle!(
    /// GL renderbuffer object name
    RenderbufferNative
);
native_handle!(
    /// GL framebuffer object name
    FramebufferNative
);
native_handle!(
    /// GL shader object name
    Shader
);
native_handle!(
    /// GL program object name
    Program
);
native_handle!(
    /// GL buffer object name
    Buffer
);

impl FramebufferNative {
    /// Never a real framebuffer; marks "unknown" in the bound-state cache.
    pub const INVALID: FramebufferNative = FramebufferNative(u32::MAX);
}

/// A render target as seen by the context.
///
/// The context never owns framebuffers it is handed; `width` and `height` define the viewport
/// used when drawing into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framebuffer {
    /// Framebuffer object to draw into
    pub native: FramebufferNative,
    /// Width in pixels
    pub width: i32,
    /// Height in pixels
    pub height: i32,
}

impl Framebuffer {
    /// Describe a framebuffer of the given size
    pub fn new(native: FramebufferNative, width: i32, height: i32) -> Framebuffer {
        Framebuffer { native, width, height }
    }
}

/// Pipeline stage of a shader object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

impl ShaderStage {
    pub(super) fn gl_type(self) -> GLenum {
        match self {
            ShaderStage::Vertex => ffi::VERTEX_SHADER,
            ShaderStage::Fragment => ffi::FRAGMENT_SHADER,
        }
    }
}

/// A rectangular pixel upload into a texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePixelsArgs<'a> {
    /// Tightly packed RGBA8 pixels, `4 * width * height` bytes
    pub pixels: &'a [u8],
    /// Left edge of the region
    pub x: i32,
    /// Bottom edge of the region
    pub y: i32,
    /// Width of the region
    pub width: i32,
    /// Height of the region
    pub height: i32,
}
