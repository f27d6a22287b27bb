//! Axis-aligned bounding box

use crate::foundation::math::{Mat4, Point3, Vec3};

use super::BoundingSphere;

/// Axis-aligned bounding box.
///
/// An empty box has `min > max` on every axis, so the first
/// [`BoundingBox::expand_with_point`] snaps it onto that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl BoundingBox {
    /// Create a box from its corners
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The empty box
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::MAX),
            max: Vec3::repeat(f32::MIN),
        }
    }

    /// Smallest box enclosing all points
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut bounds = Self::empty();
        for point in points {
            bounds.expand_with_point(point);
        }
        bounds
    }

    /// True when the box encloses nothing
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Edge lengths
    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::zeros()
        } else {
            self.max - self.min
        }
    }

    /// Check if this box contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if this box overlaps another
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Grow the box to include a point
    pub fn expand_with_point(&mut self, point: &Vec3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Grow the box to include another box
    pub fn union(&mut self, other: &Self) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Re-derive the bounds from all eight transformed corners
    pub fn apply_transform(&mut self, transform: &Mat4) {
        if self.is_empty() {
            return;
        }
        let (lo, hi) = (self.min, self.max);
        *self = Self::empty();
        for i in 0..8 {
            let corner = Point3::new(
                if i & 1 == 0 { lo.x } else { hi.x },
                if i & 2 == 0 { lo.y } else { hi.y },
                if i & 4 == 0 { lo.z } else { hi.z },
            );
            self.expand_with_point(&transform.transform_point(&corner).coords);
        }
    }

    /// Translate both corners
    pub fn translate(&mut self, offset: &Vec3) {
        if !self.is_empty() {
            self.min += offset;
            self.max += offset;
        }
    }

    /// Sphere that encloses this box
    pub fn bounding_sphere(&self) -> BoundingSphere {
        if self.is_empty() {
            BoundingSphere::empty()
        } else {
            BoundingSphere::new(self.center(), self.size().norm() * 0.5)
        }
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}
