//! Vertex geometry

use std::cell::OnceCell;

use crate::foundation::math::Vec3;
use crate::spatial::{BoundingBox, BoundingSphere};

use super::resource::{Disposal, ResourceId};

/// Semantic of an interleaved vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Object-space position
    Position,
    /// Surface normal
    Normal,
    /// Texture coordinates
    Uv,
    /// Per-vertex color
    Color,
}

impl AttributeKind {
    /// Shader location the attribute is bound to
    pub const fn location(self) -> u32 {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::Uv => 2,
            Self::Color => 3,
        }
    }
}

/// One attribute in the interleaved vertex layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute semantic
    pub kind: AttributeKind,
    /// Number of floats
    pub components: u32,
}

impl VertexAttribute {
    /// Create an attribute
    pub const fn new(kind: AttributeKind, components: u32) -> Self {
        Self { kind, components }
    }

    /// Three-component position
    pub const fn position() -> Self {
        Self::new(AttributeKind::Position, 3)
    }

    /// Three-component normal
    pub const fn normal() -> Self {
        Self::new(AttributeKind::Normal, 3)
    }

    /// Two-component texture coordinate
    pub const fn uv() -> Self {
        Self::new(AttributeKind::Uv, 2)
    }
}

/// How vertices are assembled into primitives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Primitive {
    /// Independent triangles
    #[default]
    Triangles,
    /// Independent line segments
    Lines,
    /// Closed line strip
    LineLoop,
}

/// Interleaved vertex data with optional indices.
///
/// Bounds are computed from the position attribute on first request.
/// Dropping or disposing the geometry notifies every GPU cache holding it.
#[derive(Debug)]
pub struct Geometry {
    vertices: Vec<f32>,
    indices: Vec<u32>,
    attributes: Vec<VertexAttribute>,
    /// Primitive topology
    pub primitive: Primitive,
    bounds: OnceCell<(BoundingBox, BoundingSphere)>,
    disposal: Disposal,
}

impl Geometry {
    /// Create non-indexed geometry
    pub fn new(vertices: Vec<f32>, attributes: Vec<VertexAttribute>) -> Self {
        Self::with_indices(vertices, Vec::new(), attributes)
    }

    /// Create indexed geometry
    pub fn with_indices(vertices: Vec<f32>, indices: Vec<u32>, attributes: Vec<VertexAttribute>) -> Self {
        Self {
            vertices,
            indices,
            attributes,
            primitive: Primitive::Triangles,
            bounds: OnceCell::new(),
            disposal: Disposal::new(ResourceId::next()),
        }
    }

    /// Set the primitive topology (builder style)
    #[must_use]
    pub const fn with_primitive(mut self, primitive: Primitive) -> Self {
        self.primitive = primitive;
        self
    }

    /// Resource identity
    pub const fn id(&self) -> ResourceId {
        self.disposal.id()
    }

    /// Interleaved vertex floats
    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Index data, empty for non-indexed geometry
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Vertex layout
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Floats per vertex
    pub fn stride(&self) -> usize {
        self.attributes.iter().map(|a| a.components as usize).sum()
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        match self.stride() {
            0 => 0,
            stride => self.vertices.len() / stride,
        }
    }

    /// Whether a given attribute is present
    pub fn has_attribute(&self, kind: AttributeKind) -> bool {
        self.attributes.iter().any(|a| a.kind == kind)
    }

    /// Axis-aligned bounds of all positions
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounds().0
    }

    /// Sphere around all positions
    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.bounds().1
    }

    /// Whether the geometry was disposed
    pub fn is_disposed(&self) -> bool {
        self.disposal.is_disposed()
    }

    /// Release GPU resources held for this geometry. Idempotent.
    pub fn dispose(&self) {
        self.disposal.dispose();
    }

    /// Disposal signal, for caches registering eviction callbacks
    pub const fn disposal(&self) -> &Disposal {
        &self.disposal
    }

    fn bounds(&self) -> &(BoundingBox, BoundingSphere) {
        self.bounds.get_or_init(|| {
            let positions = self.positions();
            let bounds = BoundingBox::from_points(positions.iter());

            // Center on the box, then grow to cover every point exactly.
            let center = bounds.center();
            let mut sphere = BoundingSphere::empty();
            if !bounds.is_empty() {
                let radius_sq = positions
                    .iter()
                    .map(|p| (p - center).norm_squared())
                    .fold(0.0_f32, f32::max);
                sphere = BoundingSphere::new(center, radius_sq.sqrt());
            }
            (bounds, sphere)
        })
    }

    fn positions(&self) -> Vec<Vec3> {
        let stride = self.stride();
        if stride == 0 {
            return Vec::new();
        }
        let mut offset = 0;
        for attribute in &self.attributes {
            if attribute.kind == AttributeKind::Position {
                return self
                    .vertices
                    .chunks_exact(stride)
                    .map(|vertex| {
                        let read = |i: usize| if i < attribute.components as usize { vertex[offset + i] } else { 0.0 };
                        Vec3::new(read(0), read(1), read(2))
                    })
                    .collect();
            }
            offset += attribute.components as usize;
        }
        Vec::new()
    }
}
