//! Plane in Hessian normal form

use crate::foundation::math::{Vec3, Vec4};

/// Plane defined by a unit normal and a constant: `normal · p + constant = 0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Signed distance of the origin from the plane
    pub constant: f32,
}

impl Plane {
    /// Create a plane, normalizing the normal
    pub fn new(normal: Vec3, constant: f32) -> Self {
        let mut plane = Self { normal, constant };
        plane.normalize();
        plane
    }

    /// Plane from raw `ax + by + cz + d` coefficients
    pub fn from_coefficients(coefficients: &Vec4) -> Self {
        Self::new(coefficients.xyz(), coefficients.w)
    }

    /// Plane through `point` facing along `normal`
    pub fn from_normal_and_point(normal: &Vec3, point: &Vec3) -> Self {
        let normal = normal.normalize();
        Self { normal, constant: -normal.dot(point) }
    }

    /// Scale normal and constant so the normal has unit length
    pub fn normalize(&mut self) {
        let length = self.normal.norm();
        if length > 0.0 {
            self.normal /= length;
            self.constant /= length;
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.constant
    }
}
