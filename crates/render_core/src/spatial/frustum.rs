//! View frustum for visibility culling

use crate::foundation::math::{Mat4, Vec3};

use super::{BoundingBox, BoundingSphere, Plane};

/// Six inward-facing planes (left, right, bottom, top, near, far)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Frustum planes, normals pointing inside
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub const fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a projection * view matrix.
    ///
    /// Gribb-Hartmann: each plane is the last row plus or minus one of the
    /// first three, normalized once here.
    pub fn from_matrix(view_projection: &Mat4) -> Self {
        let row = |i: usize| view_projection.row(i).transpose();
        let w = row(3);
        let (x, y, z) = (row(0), row(1), row(2));

        Self::new([
            Plane::from_coefficients(&(w + x)),
            Plane::from_coefficients(&(w - x)),
            Plane::from_coefficients(&(w + y)),
            Plane::from_coefficients(&(w - y)),
            Plane::from_coefficients(&(w + z)),
            Plane::from_coefficients(&(w - z)),
        ])
    }

    /// Check if a point is inside the frustum
    pub fn contains_point(&self, point: &Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(point) >= 0.0)
    }

    /// Check if a sphere is inside or intersects the frustum
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        if sphere.is_empty() {
            return false;
        }
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(&sphere.center) >= -sphere.radius)
    }

    /// Check if a box is inside or intersects the frustum
    pub fn intersects_box(&self, bounds: &BoundingBox) -> bool {
        if bounds.is_empty() {
            return false;
        }
        self.planes.iter().all(|plane| {
            // The corner furthest along the normal; if it is outside, all are.
            let positive = Vec3::new(
                if plane.normal.x >= 0.0 { bounds.max.x } else { bounds.min.x },
                if plane.normal.y >= 0.0 { bounds.max.y } else { bounds.min.y },
                if plane.normal.z >= 0.0 { bounds.max.z } else { bounds.min.z },
            );
            plane.distance_to_point(&positive) >= 0.0
        })
    }
}
