//! Uniform values and per-program uniform slots
//!
//! A slot remembers the last value written to it and only reaches the
//! backend when that value actually changes.

use crate::foundation::math::{Color, Mat3, Mat4, Vec2, Vec3, Vec4};

use super::backend::GraphicsBackend;

/// Uniform declaration type as reflected from a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
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
    /// `mat3`
    Mat3,
    /// `mat4`
    Mat4,
    /// `sampler2D`, set as a texture unit index
    Sampler2D,
}

impl UniformType {
    /// Parse a GLSL type name
    pub fn from_glsl(name: &str) -> Option<Self> {
        Some(match name {
            "int" | "bool" => Self::Int,
            "float" => Self::Float,
            "vec2" => Self::Vec2,
            "vec3" => Self::Vec3,
            "vec4" => Self::Vec4,
            "mat3" => Self::Mat3,
            "mat4" => Self::Mat4,
            "sampler2D" => Self::Sampler2D,
            _ => return None,
        })
    }
}

/// Value written to a uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Integer or texture unit
    Int(i32),
    /// Scalar
    Float(f32),
    /// 2-component vector
    Vec2(Vec2),
    /// 3-component vector
    Vec3(Vec3),
    /// 4-component vector
    Vec4(Vec4),
    /// Color, uploaded as a `vec3`
    Color(Color),
    /// 3x3 matrix
    Mat3(Mat3),
    /// 4x4 matrix
    Mat4(Mat4),
}

impl UniformValue {
    /// Whether this value can be written to a uniform of the given type
    pub const fn fits(&self, ty: UniformType) -> bool {
        matches!(
            (self, ty),
            (Self::Int(_), UniformType::Int | UniformType::Sampler2D)
                | (Self::Float(_), UniformType::Float)
                | (Self::Vec2(_), UniformType::Vec2)
                | (Self::Vec3(_) | Self::Color(_), UniformType::Vec3)
                | (Self::Vec4(_), UniformType::Vec4)
                | (Self::Mat3(_), UniformType::Mat3)
                | (Self::Mat4(_), UniformType::Mat4)
        )
    }

    /// Short shape name for diagnostics
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Vec2(_) => "vec2",
            Self::Vec3(_) => "vec3",
            Self::Vec4(_) => "vec4",
            Self::Color(_) => "color",
            Self::Mat3(_) => "mat3",
            Self::Mat4(_) => "mat4",
        }
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<Vec3> for UniformValue {
    fn from(value: Vec3) -> Self {
        Self::Vec3(value)
    }
}

impl From<Color> for UniformValue {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        Self::Mat4(value)
    }
}

/// Uniforms the renderer sets on every built-in program.
///
/// A program that does not declare one of these simply does not receive it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    /// Model (world) matrix
    Model,
    /// Material opacity
    Opacity,
    /// Framebuffer size in pixels
    Resolution,
    /// Flat material color
    Color,
    /// Texture unit of the color map
    TextureMap,
    /// UV transform of the color map
    TextureTransform,
    /// Accumulated ambient light
    AmbientLight,
    /// Lit material diffuse color
    DiffuseColor,
    /// Lit material specular color
    SpecularColor,
    /// Lit material specular exponent
    Shininess,
    /// Fog color
    FogColor,
    /// Fog model, 0 linear and 1 exponential
    FogType,
    /// Linear fog start
    FogNear,
    /// Linear fog end
    FogFar,
    /// Exponential fog density
    FogDensity,
}

impl Uniform {
    /// Name declared in shader source
    pub const fn name(self) -> &'static str {
        match self {
            Self::Model => "u_Model",
            Self::Opacity => "u_Opacity",
            Self::Resolution => "u_Resolution",
            Self::Color => "u_Color",
            Self::TextureMap => "u_TextureMap",
            Self::TextureTransform => "u_TextureTransform",
            Self::AmbientLight => "u_AmbientLight",
            Self::DiffuseColor => "u_DiffuseColor",
            Self::SpecularColor => "u_SpecularColor",
            Self::Shininess => "u_Shininess",
            Self::FogColor => "u_FogColor",
            Self::FogType => "u_FogType",
            Self::FogNear => "u_FogNear",
            Self::FogFar => "u_FogFar",
            Self::FogDensity => "u_FogDensity",
        }
    }
}

/// Uniform errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UniformError {
    /// The linked program has no active uniform with this name
    #[error("Uniform '{0}' is not declared by the program")]
    NotFound(String),

    /// Value shape does not match the declared type
    #[error("Uniform '{name}' is declared as {expected:?}, got a {found} value")]
    TypeMismatch {
        /// Uniform name
        name: String,
        /// Reflected type
        expected: UniformType,
        /// Shape of the rejected value
        found: &'static str,
    },
}

/// Last written value of one active uniform
#[derive(Debug, Clone, PartialEq)]
pub struct UniformSlot {
    location: i32,
    ty: UniformType,
    value: Option<UniformValue>,
    dirty: bool,
}

impl UniformSlot {
    /// Slot for a reflected uniform, with no value yet
    pub const fn new(location: i32, ty: UniformType) -> Self {
        Self { location, ty, value: None, dirty: false }
    }

    /// Backend location
    pub const fn location(&self) -> i32 {
        self.location
    }

    /// Reflected type
    pub const fn ty(&self) -> UniformType {
        self.ty
    }

    /// Last written value
    pub const fn value(&self) -> Option<&UniformValue> {
        self.value.as_ref()
    }

    /// Whether the value changed since the last upload
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Store a value, marking the slot dirty only if it differs.
    /// Returns whether the slot changed.
    pub fn set(&mut self, name: &str, value: UniformValue) -> Result<bool, UniformError> {
        if !value.fits(self.ty) {
            return Err(UniformError::TypeMismatch {
                name: name.to_string(),
                expected: self.ty,
                found: value.shape(),
            });
        }
        if self.value == Some(value) {
            return Ok(false);
        }
        self.value = Some(value);
        self.dirty = true;
        Ok(true)
    }

    /// Upload the value if it changed. Returns whether an upload happened.
    pub fn upload_if_needed<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        match &self.value {
            Some(value) => {
                backend.upload_uniform(self.location, value);
                true
            }
            None => false,
        }
    }
}
