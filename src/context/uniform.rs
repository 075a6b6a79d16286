use std::fmt;

use tracing::trace;

use super::{
    contract_violation, location::UniformLocation, AttribLocation, ContractViolation, GraphicsContext,
    Program,
};
use crate::driver::Driver;

/// Scalar, vector or aggregate kind of a shader variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BasicType {
    /// No type
    #[default]
    None,
    /// `bool`
    Bool,
    /// `int`
    Int,
    /// `float`
    Float,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `mat2`
    Mat2,
    /// `mat3`
    Mat3,
    /// `mat4`
    Mat4,
    /// `sampler2D`
    Texture,
    /// Fixed-length array, element type in [`UniformType::sub`]
    Array,
    /// Struct, member types in [`UniformType::sub`]
    Struct,
}

/// Type of a uniform as declared by the shader compiler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UniformType {
    /// Outermost kind
    pub main: BasicType,
    /// Element type of an [`BasicType::Array`], members of a [`BasicType::Struct`]
    pub sub: Vec<UniformType>,
    /// Array length
    pub length: usize,
}

impl UniformType {
    /// A non-aggregate type
    pub fn basic(main: BasicType) -> UniformType {
        UniformType {
            main,
            ..Default::default()
        }
    }

    /// An array of `length` elements of type `element`
    pub fn array(element: UniformType, length: usize) -> UniformType {
        UniformType {
            main: BasicType::Array,
            sub: vec![element],
            length,
        }
    }

    /// The type that decides which upload call is used
    fn upload_type(&self) -> BasicType {
        match self.main {
            BasicType::Array => self.sub.first().map(|element| element.main).unwrap_or(BasicType::None),
            main => main,
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.main {
            BasicType::Array => match self.sub.first() {
                Some(element) => write!(f, "{}[{}]", element, self.length),
                None => write!(f, "Array[{}]", self.length),
            },
            BasicType::Struct => {
                f.write_str("Struct{")?;
                for (i, member) in self.sub.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", member)?;
                }
                f.write_str("}")
            }
            main => write!(f, "{:?}", main),
        }
    }
}

impl<D: Driver> GraphicsContext<D> {
    /// Looks up a uniform of `program`, memoized per program
    pub fn uniform_location(&mut self, program: Program, name: &str) -> Option<UniformLocation> {
        self.location_cache.uniform_location(&mut self.driver, program, name)
    }

    /// Looks up a vertex attribute of `program`, memoized per program
    pub fn attrib_location(&mut self, program: Program, name: &str) -> Option<AttribLocation> {
        self.location_cache.attrib_location(&mut self.driver, program, name)
    }

    /// Sets an `int` (or sampler) uniform of the program in use.
    ///
    /// Returns `false` without touching the driver if `program` has no uniform `name`.
    pub fn uniform_int(&mut self, program: Program, name: &str, value: i32) -> bool {
        let Some(location) = self.uniform_location(program, name) else {
            return false;
        };
        self.driver.uniform_1i(location.0, value);
        true
    }

    /// Sets a uniform of the program in use from raw 32-bit words.
    ///
    /// The words are reinterpreted as `f32` or `i32` depending on `ty`; for arrays the element
    /// type decides. Returns `false` without touching the driver if `program` has no uniform
    /// `name`.
    ///
    /// # Panics
    ///
    /// Types without an upload call (`bool`, samplers, structs, nested arrays) are a
    /// [`ContractViolation`].
    pub fn uniforms(&mut self, program: Program, name: &str, value: &[u32], ty: &UniformType) -> bool {
        let Some(UniformLocation(location)) = self.uniform_location(program, name) else {
            return false;
        };
        trace!(parent: &self.span, uniform = name, %ty, len = value.len(), "Uploading uniform");

        let floats: &[f32] = bytemuck::cast_slice(value);
        match ty.upload_type() {
            BasicType::Float => self.driver.uniform_1fv(location, floats),
            BasicType::Int => self.driver.uniform_1iv(location, bytemuck::cast_slice(value)),
            BasicType::Vec2 => self.driver.uniform_2fv(location, floats),
            BasicType::Vec3 => self.driver.uniform_3fv(location, floats),
            BasicType::Vec4 => self.driver.uniform_4fv(location, floats),
            BasicType::Mat2 => self.driver.uniform_matrix_2fv(location, floats),
            BasicType::Mat3 => self.driver.uniform_matrix_3fv(location, floats),
            BasicType::Mat4 => self.driver.uniform_matrix_4fv(location, floats),
            _ => contract_violation(ContractViolation::UnexpectedUniformType(ty.to_string())),
        }
        true
    }
}
