//! Scene graph nodes

use slotmap::new_key_type;

use crate::foundation::math::{Mat4, Vec3};
use crate::render::light::Light;
use crate::render::mesh::{InstancedMesh, Mesh};

use super::Transform;

new_key_type! {
    /// Generational handle to a node stored in a [`super::Scene`].
    ///
    /// A handle to a removed node never resolves again.
    pub struct NodeId;
}

/// What a node contributes to a frame
#[derive(Debug)]
pub enum NodeKind {
    /// Pure transform node
    Group,
    /// Single drawable
    Mesh(Mesh),
    /// Drawable repeated with per-instance transforms and colors
    InstancedMesh(InstancedMesh),
    /// Light source
    Light(Light),
}

impl NodeKind {
    /// Short label for logging
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::Mesh(_) => "mesh",
            Self::InstancedMesh(_) => "instanced mesh",
            Self::Light(_) => "light",
        }
    }
}

/// A node in the scene graph.
///
/// Nodes are owned by the scene arena; the hierarchy is expressed with
/// [`NodeId`] handles. The parent edge is the only ownership edge: removing
/// a node destroys its whole subtree.
#[derive(Debug)]
pub struct Node {
    /// Display name
    pub name: String,
    /// Recompute the world transform when this node or an ancestor moves.
    /// When false the world transform is frozen after its first evaluation.
    pub transform_auto_update: bool,
    /// Test the node's bounds against the camera frustum before drawing
    pub frustum_culled: bool,
    pub(crate) transform: Transform,
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) world: Mat4,
    /// Bumped every time `world` is recomputed.
    pub(crate) world_revision: u64,
    /// Parent's `world_revision` that `world` was derived from.
    pub(crate) parent_revision: u64,
}

impl Node {
    /// Create a detached node
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: kind.label().to_string(),
            transform_auto_update: true,
            frustum_culled: true,
            transform: Transform::new(),
            kind,
            parent: None,
            children: Vec::new(),
            world: Mat4::identity(),
            world_revision: 0,
            parent_revision: 0,
        }
    }

    /// Transform-only node
    pub fn group() -> Self {
        Self::new(NodeKind::Group)
    }

    /// Node drawing a single mesh
    pub fn mesh(mesh: Mesh) -> Self {
        Self::new(NodeKind::Mesh(mesh))
    }

    /// Node drawing an instanced mesh
    pub fn instanced(mesh: InstancedMesh) -> Self {
        Self::new(NodeKind::InstancedMesh(mesh))
    }

    /// Light node
    pub fn light(light: Light) -> Self {
        Self::new(NodeKind::Light(light))
    }

    /// Set the name (builder style)
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the initial position (builder style)
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.set_position(position);
        self
    }

    /// Local transform
    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Mutable local transform. Any change is picked up by the next
    /// propagation.
    pub fn transform_mut(&mut self) -> &mut Transform {
        &mut self.transform
    }

    /// Payload
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Mutable payload
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Parent handle, `None` for the root or a detached node
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child handles in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Cached world transform as of the last propagation
    pub const fn cached_world_transform(&self) -> &Mat4 {
        &self.world
    }

    /// Translation column of the cached world transform
    pub fn cached_world_position(&self) -> Vec3 {
        self.world.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Whether the world transform has been evaluated at least once
    pub(crate) const fn has_world(&self) -> bool {
        self.world_revision != 0
    }
}
