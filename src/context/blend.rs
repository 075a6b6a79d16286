use crate::driver::ffi::{self, types::GLenum};

use super::{contract_violation, ContractViolation};

/// Factor applied to a source or destination term of the blend equation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlendFactor {
    /// `0`
    Zero,
    /// `1`
    One,
    /// Source color
    SourceColor,
    /// `1 - source color`
    OneMinusSourceColor,
    /// Source alpha
    SourceAlpha,
    /// `1 - source alpha`
    OneMinusSourceAlpha,
    /// Destination color
    DestinationColor,
    /// `1 - destination color`
    OneMinusDestinationColor,
    /// Destination alpha
    DestinationAlpha,
    /// `1 - destination alpha`
    OneMinusDestinationAlpha,
    /// `min(source alpha, 1 - destination alpha)`
    SourceAlphaSaturated,
}

impl BlendFactor {
    /// Decodes a selector handed over by the draw-command layer.
    ///
    /// # Panics
    ///
    /// Unknown selectors are a [`ContractViolation`].
    pub fn from_raw(raw: u8) -> BlendFactor {
        match raw {
            0 => BlendFactor::Zero,
            1 => BlendFactor::One,
            2 => BlendFactor::SourceColor,
            3 => BlendFactor::OneMinusSourceColor,
            4 => BlendFactor::SourceAlpha,
            5 => BlendFactor::OneMinusSourceAlpha,
            6 => BlendFactor::DestinationColor,
            7 => BlendFactor::OneMinusDestinationColor,
            8 => BlendFactor::DestinationAlpha,
            9 => BlendFactor::OneMinusDestinationAlpha,
            10 => BlendFactor::SourceAlphaSaturated,
            x => contract_violation(ContractViolation::InvalidBlendFactor(x)),
        }
    }

    pub(super) fn gl_factor(self) -> GLenum {
        match self {
            BlendFactor::Zero => ffi::ZERO,
            BlendFactor::One => ffi::ONE,
            BlendFactor::SourceColor => ffi::SRC_COLOR,
            BlendFactor::OneMinusSourceColor => ffi::ONE_MINUS_SRC_COLOR,
            BlendFactor::SourceAlpha => ffi::SRC_ALPHA,
            BlendFactor::OneMinusSourceAlpha => ffi::ONE_MINUS_SRC_ALPHA,
            BlendFactor::DestinationColor => ffi::DST_COLOR,
            BlendFactor::OneMinusDestinationColor => ffi::ONE_MINUS_DST_COLOR,
            BlendFactor::DestinationAlpha => ffi::DST_ALPHA,
            BlendFactor::OneMinusDestinationAlpha => ffi::ONE_MINUS_DST_ALPHA,
            BlendFactor::SourceAlphaSaturated => ffi::SRC_ALPHA_SATURATE,
        }
    }
}

/// Operation combining the weighted source and destination terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlendOperation {
    /// `source + destination`
    Add,
    /// `source - destination`
    Subtract,
    /// `destination - source`
    ReverseSubtract,
}

impl BlendOperation {
    /// Decodes a selector handed over by the draw-command layer.
    ///
    /// # Panics
    ///
    /// Unknown selectors are a [`ContractViolation`].
    pub fn from_raw(raw: u8) -> BlendOperation {
        match raw {
            0 => BlendOperation::Add,
            1 => BlendOperation::Subtract,
            2 => BlendOperation::ReverseSubtract,
            x => contract_violation(ContractViolation::InvalidBlendOperation(x)),
        }
    }

    pub(super) fn gl_equation(self) -> GLenum {
        match self {
            BlendOperation::Add => ffi::FUNC_ADD,
            BlendOperation::Subtract => ffi::FUNC_SUBTRACT,
            BlendOperation::ReverseSubtract => ffi::FUNC_REVERSE_SUBTRACT,
        }
    }
}

/// Complete blend configuration, applied as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Blend {
    /// Source factor of the color channels
    pub src_rgb: BlendFactor,
    /// Destination factor of the color channels
    pub dst_rgb: BlendFactor,
    /// Source factor of the alpha channel
    pub src_alpha: BlendFactor,
    /// Destination factor of the alpha channel
    pub dst_alpha: BlendFactor,
    /// Operation of the color channels
    pub op_rgb: BlendOperation,
    /// Operation of the alpha channel
    pub op_alpha: BlendOperation,
}

impl Blend {
    /// Premultiplied-alpha source-over compositing
    pub const SOURCE_OVER: Blend = Blend::uniform(BlendFactor::One, BlendFactor::OneMinusSourceAlpha);
    /// Source replaces destination
    pub const COPY: Blend = Blend::uniform(BlendFactor::One, BlendFactor::Zero);
    /// Destination is cleared
    pub const CLEAR: Blend = Blend::uniform(BlendFactor::Zero, BlendFactor::Zero);
    /// Source is added to destination
    pub const LIGHTER: Blend = Blend::uniform(BlendFactor::One, BlendFactor::One);

    /// Blend using the same factors for color and alpha, combined by addition
    pub const fn uniform(src: BlendFactor, dst: BlendFactor) -> Blend {
        Blend {
            src_rgb: src,
            dst_rgb: dst,
            src_alpha: src,
            dst_alpha: dst,
            op_rgb: BlendOperation::Add,
            op_alpha: BlendOperation::Add,
        }
    }

    /// Decodes six raw selectors, in field order.
    ///
    /// # Panics
    ///
    /// Any unknown selector is a [`ContractViolation`].
    pub fn from_raw(raw: [u8; 6]) -> Blend {
        Blend {
            src_rgb: BlendFactor::from_raw(raw[0]),
            dst_rgb: BlendFactor::from_raw(raw[1]),
            src_alpha: BlendFactor::from_raw(raw[2]),
            dst_alpha: BlendFactor::from_raw(raw[3]),
            op_rgb: BlendOperation::from_raw(raw[4]),
            op_alpha: BlendOperation::from_raw(raw[5]),
        }
    }
}

impl Default for Blend {
    fn default() -> Self {
        Blend::SOURCE_OVER
    }
}
