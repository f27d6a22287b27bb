//! Bounding sphere

use crate::foundation::math::{max_scale_on_axis, Mat4, Point3, Vec3};

/// Bounding sphere. A negative radius marks the empty sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Center of the sphere
    pub center: Vec3,
    /// Radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Create a new bounding sphere
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// The empty sphere
    pub fn empty() -> Self {
        Self::new(Vec3::zeros(), -1.0)
    }

    /// True when the sphere encloses nothing
    pub fn is_empty(&self) -> bool {
        self.radius < 0.0
    }

    /// Check if a point lies inside the sphere
    pub fn contains_point(&self, point: &Vec3) -> bool {
        !self.is_empty() && (point - self.center).norm_squared() <= self.radius * self.radius
    }

    /// Check if two spheres overlap
    pub fn intersects(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let reach = self.radius + other.radius;
        (other.center - self.center).norm_squared() <= reach * reach
    }

    /// Grow the sphere to include a point.
    ///
    /// The center moves towards the point by half the overshoot, so the far
    /// side of the old sphere stays on the new surface.
    pub fn expand_with_point(&mut self, point: &Vec3) {
        if self.is_empty() {
            self.center = *point;
            self.radius = 0.0;
            return;
        }

        let offset = point - self.center;
        let distance = offset.norm();
        if distance > self.radius {
            let half_overshoot = (distance - self.radius) * 0.5;
            self.center += offset * (half_overshoot / distance);
            self.radius += half_overshoot;
        }
    }

    /// Grow the sphere to enclose another sphere
    pub fn union(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }

        let offset = other.center - self.center;
        let distance = offset.norm();
        if distance + other.radius <= self.radius {
            return;
        }
        if distance + self.radius <= other.radius {
            *self = *other;
            return;
        }

        let radius = (distance + self.radius + other.radius) * 0.5;
        self.center += offset * ((radius - self.radius) / distance);
        self.radius = radius;
    }

    /// Transform the center and scale the radius by the largest axis scale.
    ///
    /// Conservative under non-uniform scale.
    pub fn apply_transform(&mut self, transform: &Mat4) {
        if self.is_empty() {
            return;
        }
        self.center = transform.transform_point(&Point3::from(self.center)).coords;
        self.radius *= max_scale_on_axis(transform);
    }

    /// Copy of this sphere with a transform applied
    #[must_use]
    pub fn transformed(&self, transform: &Mat4) -> Self {
        let mut sphere = *self;
        sphere.apply_transform(transform);
        sphere
    }
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self::empty()
    }
}
