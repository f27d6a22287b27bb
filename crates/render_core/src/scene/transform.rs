//! Local transform of a scene node
//!
//! Position, Euler rotation and scale, composed into a matrix only when read.

use std::cell::Cell;

use crate::foundation::math::{Euler, Mat4, Vec3};

/// Translation, rotation and scale with a lazily composed matrix.
///
/// Every mutation marks the transform as touched. The touched flag is owned
/// by the scene's propagation pass; reading the matrix does not clear it.
#[derive(Debug, Clone)]
pub struct Transform {
    position: Vec3,
    rotation: Euler,
    scale: Vec3,
    matrix: Cell<Mat4>,
    stale: Cell<bool>,
    touched: bool,
}

impl Transform {
    /// Create an identity transform
    pub fn new() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Euler::default(),
            scale: Vec3::repeat(1.0),
            matrix: Cell::new(Mat4::identity()),
            stale: Cell::new(false),
            touched: true,
        }
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        let mut transform = Self::new();
        transform.set_position(position);
        transform
    }

    /// Current position
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Current rotation
    pub const fn rotation(&self) -> Euler {
        self.rotation
    }

    /// Current scale
    pub const fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Replace the position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.touch();
    }

    /// Replace the rotation
    pub fn set_rotation(&mut self, rotation: Euler) {
        self.rotation = rotation;
        self.touch();
    }

    /// Replace the scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.touch();
    }

    /// Move along the transform's own rotated axes
    pub fn translate(&mut self, offset: Vec3) {
        self.position += self.rotation.to_matrix() * offset;
        self.touch();
    }

    /// Add to the Euler angles
    pub fn rotate(&mut self, delta: Euler) {
        self.rotation = self.rotation + delta;
        self.touch();
    }

    /// Multiply the scale componentwise
    pub fn scale_by(&mut self, factor: Vec3) {
        self.scale.component_mul_assign(&factor);
        self.touch();
    }

    /// Rotate so the local -Z axis points at `target`, expressed in the same
    /// space as the position. Does nothing if the target is the position.
    pub fn look_at(&mut self, target: &Vec3) {
        if let Some(rotation) = Euler::facing(&(target - self.position)) {
            self.set_rotation(rotation);
        }
    }

    /// The composed `T * R * S` matrix
    pub fn matrix(&self) -> Mat4 {
        if self.stale.get() {
            let mut matrix = self.rotation.to_matrix().to_homogeneous();
            for col in 0..3 {
                for row in 0..3 {
                    matrix[(row, col)] *= self.scale[col];
                }
            }
            matrix[(0, 3)] = self.position.x;
            matrix[(1, 3)] = self.position.y;
            matrix[(2, 3)] = self.position.z;
            self.matrix.set(matrix);
            self.stale.set(false);
        }
        self.matrix.get()
    }

    /// Whether the transform changed since the last [`Transform::reset_touched`]
    pub const fn is_touched(&self) -> bool {
        self.touched
    }

    /// Acknowledge the latest change
    pub fn reset_touched(&mut self) {
        self.touched = false;
    }

    /// Mark as changed without modifying any component
    pub fn touch(&mut self) {
        self.stale.set(true);
        self.touched = true;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_matrix_composition_order() {
        let mut transform = Transform::new();
        transform.set_position(Vec3::new(1.0, 2.0, 3.0));
        transform.set_rotation(Euler::new(0.0, FRAC_PI_2, 0.0));
        transform.set_scale(Vec3::new(2.0, 2.0, 2.0));

        let expected = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0))
            * Euler::new(0.0, FRAC_PI_2, 0.0).to_matrix().to_homogeneous()
            * Mat4::new_scaling(2.0);
        assert_relative_eq!(transform.matrix(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_translate_follows_rotation() {
        let mut transform = Transform::new();
        transform.set_rotation(Euler::new(0.0, FRAC_PI_2, 0.0));
        transform.translate(Vec3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(transform.position(), Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_matrix_read_keeps_touched() {
        let mut transform = Transform::new();
        transform.reset_touched();
        transform.set_position(Vec3::new(0.0, 1.0, 0.0));
        assert!(transform.is_touched());
        let _ = transform.matrix();
        assert!(transform.is_touched());
        transform.reset_touched();
        assert!(!transform.is_touched());
    }

    #[test]
    fn test_matrix_is_cached_until_mutation() {
        let mut transform = Transform::from_position(Vec3::new(4.0, 0.0, 0.0));
        let first = transform.matrix();
        assert_eq!(first, transform.matrix());
        transform.scale_by(Vec3::new(1.0, 2.0, 1.0));
        assert_eq!(transform.matrix()[(1, 1)], 2.0);
    }
}
