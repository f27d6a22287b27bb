//! Culling volumes
//!
//! Bounding boxes and spheres with an explicit empty state, planes, and the
//! camera frustum used to reject off-screen geometry before submission.

pub mod bounding_box;
pub mod bounding_sphere;
pub mod frustum;
pub mod plane;

pub use bounding_box::BoundingBox;
pub use bounding_sphere::BoundingSphere;
pub use frustum::Frustum;
pub use plane::Plane;
