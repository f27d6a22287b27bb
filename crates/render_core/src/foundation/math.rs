//! Math utilities and types
//!
//! Thin aliases over `nalgebra` plus the two value types the renderer needs
//! on top of them: Euler angle rotations and linear RGB colors.

use serde::{Deserialize, Serialize};

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Rotation expressed as Euler angles in radians.
///
/// The composed rotation is `Rz(roll) * Rx(pitch) * Ry(yaw)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Euler {
    /// Rotation around the X axis
    pub pitch: f32,
    /// Rotation around the Y axis
    pub yaw: f32,
    /// Rotation around the Z axis
    pub roll: f32,
}

impl Euler {
    /// Create a rotation from pitch, yaw and roll
    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Rotation that turns the -Z axis towards `direction` with zero roll.
    ///
    /// Returns `None` for a zero-length direction.
    pub fn facing(direction: &Vec3) -> Option<Self> {
        let d = direction.try_normalize(f32::EPSILON)?;
        let yaw = (-d.x).clamp(-1.0, 1.0).asin();
        let pitch = d.y.atan2(-d.z);
        Some(Self::new(pitch, yaw, 0.0))
    }

    /// Compose the rotation matrix
    pub fn to_matrix(&self) -> Mat3 {
        let (sp, cp) = self.pitch.sin_cos();
        let (sy, cy) = self.yaw.sin_cos();
        let (sr, cr) = self.roll.sin_cos();

        Mat3::new(
            cr * cy - sr * sp * sy, -sr * cp, cr * sy + sr * sp * cy,
            sr * cy + cr * sp * sy, cr * cp, sr * sy - cr * sp * cy,
            -cp * sy, sp, cp * cy,
        )
    }
}

impl std::ops::Add for Euler {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.pitch + rhs.pitch, self.yaw + rhs.yaw, self.roll + rhs.roll)
    }
}

/// Linear RGB color with components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel
    pub r: f32,
    /// Green channel
    pub g: f32,
    /// Blue channel
    pub b: f32,
}

impl Color {
    /// Pure black
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);
    /// Pure white
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);

    /// Create a color from float components
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Create a color from a packed `0xRRGGBB` value
    pub fn from_hex(hex: u32) -> Self {
        let channel = |shift: u32| f32::from(((hex >> shift) & 0xFF) as u8) / 255.0;
        Self::new(channel(16), channel(8), channel(0))
    }

    /// Multiply every channel by a scalar
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor)
    }

    /// As a 3-component vector
    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.r, self.g, self.b)
    }

    /// As a plain array, for uniform upload
    pub const fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<u32> for Color {
    fn from(hex: u32) -> Self {
        Self::from_hex(hex)
    }
}

impl std::ops::Add for Color {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

/// Largest axis scale factor encoded in the upper 3x3 of a transform
pub fn max_scale_on_axis(matrix: &Mat4) -> f32 {
    let sx = matrix.fixed_view::<3, 1>(0, 0).norm_squared();
    let sy = matrix.fixed_view::<3, 1>(0, 1).norm_squared();
    let sz = matrix.fixed_view::<3, 1>(0, 2).norm_squared();
    sx.max(sy).max(sz).sqrt()
}
