//! Drawable meshes
//!
//! [`Mesh`] pairs shared geometry with a material. [`InstancedMesh`] draws
//! the same pair many times with per-instance transforms and colors and keeps
//! aggregate bounds that are recomputed lazily after any instance changes.

use std::cell::Cell;
use std::rc::Rc;

use crate::foundation::math::{Color, Mat4};
use crate::spatial::{BoundingBox, BoundingSphere};

use super::geometry::Geometry;
use super::material::Material;
use super::resource::{Disposal, ResourceId};

/// Errors from instance access
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceError {
    /// Index beyond the fixed instance count
    #[error("Instance index {index} out of range for {count} instances")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// Instance count
        count: usize,
    },
}

/// Geometry drawn with a material
#[derive(Debug)]
pub struct Mesh {
    geometry: Rc<Geometry>,
    material: Material,
}

impl Mesh {
    /// Create a mesh
    pub const fn new(geometry: Rc<Geometry>, material: Material) -> Self {
        Self { geometry, material }
    }

    /// Shared geometry
    pub const fn geometry(&self) -> &Rc<Geometry> {
        &self.geometry
    }

    /// Replace the geometry
    pub fn set_geometry(&mut self, geometry: Rc<Geometry>) {
        self.geometry = geometry;
    }

    /// Material
    pub const fn material(&self) -> &Material {
        &self.material
    }

    /// Mutable material
    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }
}

/// Geometry drawn `count` times with per-instance transform and color
#[derive(Debug)]
pub struct InstancedMesh {
    geometry: Rc<Geometry>,
    material: Material,
    transforms: Vec<Mat4>,
    colors: Vec<Color>,
    bounds: Cell<Option<(BoundingBox, BoundingSphere)>>,
    transforms_touched: Cell<bool>,
    colors_touched: Cell<bool>,
    disposal: Disposal,
}

impl InstancedMesh {
    /// Create `count` instances with identity transforms and white color
    pub fn new(geometry: Rc<Geometry>, material: Material, count: usize) -> Self {
        Self {
            geometry,
            material,
            transforms: vec![Mat4::identity(); count],
            colors: vec![Color::WHITE; count],
            bounds: Cell::new(None),
            transforms_touched: Cell::new(true),
            colors_touched: Cell::new(true),
            disposal: Disposal::new(ResourceId::next()),
        }
    }

    /// Resource identity of the instance buffers
    pub const fn id(&self) -> ResourceId {
        self.disposal.id()
    }

    /// Number of instances
    pub fn count(&self) -> usize {
        self.transforms.len()
    }

    /// Shared geometry
    pub const fn geometry(&self) -> &Rc<Geometry> {
        &self.geometry
    }

    /// Material
    pub const fn material(&self) -> &Material {
        &self.material
    }

    /// Mutable material
    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    /// Per-instance transforms
    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    /// Per-instance colors
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    /// Transform of one instance
    pub fn transform_at(&self, index: usize) -> Result<&Mat4, InstanceError> {
        self.transforms.get(index).ok_or(InstanceError::OutOfRange { index, count: self.count() })
    }

    /// Color of one instance
    pub fn color_at(&self, index: usize) -> Result<Color, InstanceError> {
        self.colors.get(index).copied().ok_or(InstanceError::OutOfRange { index, count: self.count() })
    }

    /// Replace the transform of one instance
    pub fn set_transform_at(&mut self, index: usize, transform: Mat4) -> Result<(), InstanceError> {
        let count = self.count();
        let slot = self.transforms.get_mut(index).ok_or(InstanceError::OutOfRange { index, count })?;
        *slot = transform;
        self.transforms_touched.set(true);
        self.bounds.set(None);
        Ok(())
    }

    /// Replace the color of one instance
    pub fn set_color_at(&mut self, index: usize, color: Color) -> Result<(), InstanceError> {
        let count = self.count();
        let slot = self.colors.get_mut(index).ok_or(InstanceError::OutOfRange { index, count })?;
        *slot = color;
        self.colors_touched.set(true);
        Ok(())
    }

    /// Union of every instance's geometry bounds, in the mesh's local space
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounds().0
    }

    /// Sphere enclosing every instance, in the mesh's local space
    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.bounds().1
    }

    /// Whether instance transforms changed since the last upload
    pub fn transforms_touched(&self) -> bool {
        self.transforms_touched.get()
    }

    /// Whether instance colors changed since the last upload
    pub fn colors_touched(&self) -> bool {
        self.colors_touched.get()
    }

    /// Acknowledge that the current instance data reached the GPU
    pub(crate) fn mark_uploaded(&self) {
        self.transforms_touched.set(false);
        self.colors_touched.set(false);
    }

    /// Instance transforms as column-major floats
    pub fn transform_data(&self) -> Vec<f32> {
        self.transforms.iter().flat_map(|m| m.as_slice().iter().copied()).collect()
    }

    /// Instance colors as packed RGB floats
    pub fn color_data(&self) -> Vec<f32> {
        self.colors.iter().flat_map(Color::to_array).collect()
    }

    /// Whether the instance buffers were disposed
    pub fn is_disposed(&self) -> bool {
        self.disposal.is_disposed()
    }

    /// Release the instance buffers. Idempotent.
    pub fn dispose(&self) {
        self.disposal.dispose();
    }

    /// Disposal signal, for caches registering eviction callbacks
    pub const fn disposal(&self) -> &Disposal {
        &self.disposal
    }

    fn bounds(&self) -> (BoundingBox, BoundingSphere) {
        if let Some(bounds) = self.bounds.get() {
            return bounds;
        }

        let local_box = self.geometry.bounding_box();
        let local_sphere = self.geometry.bounding_sphere();
        let mut aggregate_box = BoundingBox::empty();
        let mut aggregate_sphere = BoundingSphere::empty();
        for transform in &self.transforms {
            let mut instance_box = local_box;
            instance_box.apply_transform(transform);
            aggregate_box.union(&instance_box);
            aggregate_sphere.union(&local_sphere.transformed(transform));
        }

        let bounds = (aggregate_box, aggregate_sphere);
        self.bounds.set(Some(bounds));
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::geometry::VertexAttribute;
    use approx::assert_relative_eq;

    fn unit_cube_corners() -> Rc<Geometry> {
        Rc::new(Geometry::new(
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            vec![VertexAttribute::position()],
        ))
    }

    #[test]
    fn test_aggregate_bounds_follow_instances() {
        let mut mesh = InstancedMesh::new(unit_cube_corners(), Material::flat(Color::WHITE), 2);
        assert_eq!(mesh.bounding_box().max, Vec3::new(1.0, 1.0, 1.0));

        mesh.set_transform_at(1, Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0))).unwrap();
        let bounds = mesh.bounding_box();
        assert_eq!(bounds.min, Vec3::zeros());
        assert_eq!(bounds.max, Vec3::new(11.0, 1.0, 1.0));

        let sphere = mesh.bounding_sphere();
        assert!(sphere.contains_point(&Vec3::new(11.0, 1.0, 1.0 - 1e-3)));
        assert_relative_eq!(sphere.center.x, 5.5, epsilon = 1e-5);
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let mut mesh = InstancedMesh::new(unit_cube_corners(), Material::flat(Color::WHITE), 1);
        assert_eq!(
            mesh.set_color_at(3, Color::BLACK),
            Err(InstanceError::OutOfRange { index: 3, count: 1 })
        );
        assert!(mesh.transform_at(1).is_err());
    }

    #[test]
    fn test_touched_flags() {
        let mut mesh = InstancedMesh::new(unit_cube_corners(), Material::flat(Color::WHITE), 1);
        assert!(mesh.transforms_touched() && mesh.colors_touched());
        mesh.mark_uploaded();
        mesh.set_color_at(0, Color::BLACK).unwrap();
        assert!(!mesh.transforms_touched());
        assert!(mesh.colors_touched());
        assert_eq!(mesh.color_data(), vec![0.0, 0.0, 0.0]);
        assert_eq!(mesh.transform_data().len(), 16);
    }
}
