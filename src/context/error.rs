use super::ShaderStage;

/// Error returned by fallible [`GraphicsContext`](super::GraphicsContext) operations
#[derive(thiserror::Error, Debug)]
pub enum GlError {
    /// A required GL function could not be resolved
    #[error("Failed to load GL function {0}")]
    FunctionLoad(&'static str),
    /// The GL library could not be opened
    #[cfg(feature = "renderer_gl")]
    #[error("Failed to open the GL library")]
    LibraryLoad(#[source] libloading::Error),
    /// The driver did not hand out a texture object
    #[error("Creating texture failed")]
    CreateTexture,
    /// The driver did not hand out a renderbuffer object
    #[error("Creating renderbuffer failed")]
    CreateRenderbuffer,
    /// The driver did not hand out a framebuffer object
    #[error("Creating framebuffer failed: the returned value is not positive but {0}")]
    CreateFramebuffer(u32),
    /// The framebuffer was reported incomplete
    #[error("Creating framebuffer failed: status {0:#x}")]
    IncompleteFramebuffer(u32),
    /// Completeness could not be determined, but the driver recorded an error
    #[error("Creating framebuffer failed: (glGetError) {0:#x}")]
    FramebufferError(u32),
    /// Completeness could not be determined and no error was recorded
    #[error("Creating framebuffer failed: unknown error")]
    FramebufferUnknown,
    /// Attaching a stencil buffer left the framebuffer incomplete
    #[error("glFramebufferRenderbuffer failed: status {0:#x}")]
    StencilAttachment(u32),
    /// The driver did not hand out a shader object
    #[error("glCreateShader failed: shader stage: {0:?}")]
    CreateShaderObject(ShaderStage),
    /// A shader could not be compiled; carries the driver's compile log
    #[error("Shader compile failed: {0}")]
    ShaderCompile(String),
    /// The driver did not hand out a program object
    #[error("glCreateProgram failed")]
    CreateProgram,
    /// A program could not be linked; carries the driver's link log
    #[error("Program link failed: {0}")]
    ProgramLink(String),
    /// A buffer could not be mapped for reading; carries `glGetError`
    #[error("Mapping buffer failed: (glGetError) {0:#x}")]
    MapBuffer(u32),
    /// The provided pixel buffer does not match the requested region
    #[error("Pixel buffer must be {expected} bytes but was {actual}")]
    UnexpectedSize {
        /// `4 * width * height`
        expected: usize,
        /// Length of the provided buffer
        actual: usize,
    },
}

/// An engine-internal inconsistency.
///
/// These are never returned as errors: they are raised through [`contract_violation`],
/// which panics.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// A raw blend factor selector outside of the known range
    #[error("invalid blend factor {0}")]
    InvalidBlendFactor(u8),
    /// A raw blend operation selector outside of the known range
    #[error("invalid blend operation {0}")]
    InvalidBlendOperation(u8),
    /// A uniform type the upload dispatcher cannot express
    #[error("unexpected uniform type: {0}")]
    UnexpectedUniformType(String),
    /// Pixel payload size does not match the target region
    #[error("pixels must be {expected} bytes but was {actual}")]
    PixelsLength {
        /// `4 * width * height`
        expected: usize,
        /// Length of the payload
        actual: usize,
    },
    /// Uniform or attribute name with an interior NUL byte
    #[error("name {0:?} contains a NUL byte")]
    InteriorNul(String),
}

/// Aborts on a violated caller contract.
#[cold]
#[track_caller]
pub fn contract_violation(violation: ContractViolation) -> ! {
    tracing::error!("contract violation: {}", violation);
    panic!("glstate: {}", violation)
}
