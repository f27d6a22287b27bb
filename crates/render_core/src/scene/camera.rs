//! Viewing camera

use crate::foundation::math::{Mat4, Vec3};
use crate::spatial::Frustum;

use super::Transform;

/// Projection model of a camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective projection
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
        /// Width over height
        aspect: f32,
        /// Near clip distance
        near: f32,
        /// Far clip distance
        far: f32,
    },
    /// Orthographic projection
    Orthographic {
        /// Left clip plane
        left: f32,
        /// Right clip plane
        right: f32,
        /// Bottom clip plane
        bottom: f32,
        /// Top clip plane
        top: f32,
        /// Near clip distance
        near: f32,
        /// Far clip distance
        far: f32,
    },
}

impl Projection {
    /// Build the projection matrix
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Self::Perspective { fov_y, aspect, near, far } => Mat4::new_perspective(aspect, fov_y, near, far),
            Self::Orthographic { left, right, bottom, top, near, far } => {
                Mat4::new_orthographic(left, right, bottom, top, near, far)
            }
        }
    }
}

/// Camera looking down its local -Z axis
#[derive(Debug, Clone)]
pub struct Camera {
    transform: Transform,
    projection: Projection,
    projection_matrix: Mat4,
    view: Mat4,
}

impl Camera {
    /// Create a camera from a projection model
    pub fn new(projection: Projection) -> Self {
        Self {
            transform: Transform::new(),
            projection,
            projection_matrix: projection.matrix(),
            view: Mat4::identity(),
        }
    }

    /// Perspective camera; `fov_y_degrees` is the vertical field of view
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::new(Projection::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        })
    }

    /// Orthographic camera
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        Self::new(Projection::Orthographic { left, right, bottom, top, near, far })
    }

    /// Camera transform in world space
    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable camera transform
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Point the camera at a world-space target
    pub fn look_at(&mut self, target: &Vec3) {
        self.transform.look_at(target);
    }

    /// Camera position
    pub const fn position(&self) -> Vec3 {
        self.transform.position()
    }

    /// Unit viewing direction
    pub fn forward(&self) -> Vec3 {
        self.transform.rotation().to_matrix() * -Vec3::z()
    }

    /// Projection model
    pub const fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Replace the projection model
    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.projection_matrix = projection.matrix();
    }

    /// Projection matrix
    pub const fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    /// View matrix as of the last [`Camera::update_view`]
    pub const fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// Recompute the view matrix from the camera transform
    pub fn update_view(&mut self) {
        match self.transform.matrix().try_inverse() {
            Some(view) => self.view = view,
            None => log::warn!("Camera transform is not invertible, keeping previous view"),
        }
    }

    /// Projection times view
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix * self.view
    }

    /// Frustum for the current view
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.view_projection())
    }

    /// Adapt to a new framebuffer size
    #[allow(clippy::cast_precision_loss)]
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to empty framebuffer {width}x{height}");
            return;
        }
        if let Projection::Perspective { fov_y, near, far, .. } = self.projection {
            self.set_projection(Projection::Perspective {
                fov_y,
                aspect: width as f32 / height as f32,
                near,
                far,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::foundation::math::Point3;

    #[test]
    fn test_view_is_inverse_of_transform() {
        let mut camera = Camera::perspective(60.0, 1.0, 0.1, 100.0);
        camera.transform_mut().set_position(Vec3::new(0.0, 2.0, 5.0));
        camera.update_view();
        let eye = camera.view_matrix().transform_point(&Point3::new(0.0, 2.0, 5.0));
        assert_relative_eq!(eye.coords, Vec3::zeros(), epsilon = 1e-6);
    }

    #[test]
    fn test_look_at_culls_behind() {
        let mut camera = Camera::perspective(60.0, 1.0, 0.1, 100.0);
        camera.transform_mut().set_position(Vec3::new(0.0, 0.0, 10.0));
        camera.look_at(&Vec3::zeros());
        camera.update_view();
        assert_relative_eq!(camera.forward(), -Vec3::z(), epsilon = 1e-6);

        let frustum = camera.frustum();
        assert!(frustum.contains_point(&Vec3::zeros()));
        assert!(!frustum.contains_point(&Vec3::new(0.0, 0.0, 20.0)));
    }

    #[test]
    fn test_resize_updates_aspect() {
        let mut camera = Camera::perspective(45.0, 1.0, 0.1, 10.0);
        camera.resize(800, 400);
        match camera.projection() {
            Projection::Perspective { aspect, .. } => assert_relative_eq!(*aspect, 2.0),
            Projection::Orthographic { .. } => unreachable!(),
        }
        camera.resize(0, 100);
        assert!(matches!(camera.projection(), Projection::Perspective { aspect, .. } if (*aspect - 2.0).abs() < 1e-6));
    }
}
