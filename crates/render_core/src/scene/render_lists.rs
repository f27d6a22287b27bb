//! Per-scene classification of drawables and lights

use slotmap::SlotMap;

use super::{Node, NodeId, NodeKind};

/// Opaque meshes, transparent meshes and lights in depth-first scene order.
///
/// Entries are handles, not references: a node destroyed after the last
/// rebuild simply fails to resolve and is skipped.
#[derive(Debug, Clone, Default)]
pub struct RenderLists {
    opaque: Vec<NodeId>,
    transparent: Vec<NodeId>,
    lights: Vec<NodeId>,
}

impl RenderLists {
    /// Create empty lists
    pub fn new() -> Self {
        Self::default()
    }

    /// Opaque meshes
    pub fn opaque(&self) -> &[NodeId] {
        &self.opaque
    }

    /// Transparent meshes
    pub fn transparent(&self) -> &[NodeId] {
        &self.transparent
    }

    /// Lights
    pub fn lights(&self) -> &[NodeId] {
        &self.lights
    }

    /// Total number of classified nodes
    pub fn len(&self) -> usize {
        self.opaque.len() + self.transparent.len() + self.lights.len()
    }

    /// True when nothing was classified
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every entry
    pub fn clear(&mut self) {
        self.opaque.clear();
        self.transparent.clear();
        self.lights.clear();
    }

    /// Rebuild from a single depth-first walk starting at `root`
    pub(crate) fn rebuild(&mut self, nodes: &SlotMap<NodeId, Node>, root: NodeId) {
        self.clear();

        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = nodes.get(id) else { continue };

            match &node.kind {
                NodeKind::Group => {}
                NodeKind::Mesh(mesh) => self.push_drawable(id, mesh.material().is_transparent()),
                NodeKind::InstancedMesh(mesh) => {
                    self.push_drawable(id, mesh.material().is_transparent());
                }
                NodeKind::Light(_) => self.lights.push(id),
            }

            stack.extend(node.children.iter().rev().copied());
        }

        log::debug!(
            "Rebuilt render lists: {} opaque, {} transparent, {} lights",
            self.opaque.len(),
            self.transparent.len(),
            self.lights.len()
        );
    }

    fn push_drawable(&mut self, id: NodeId, transparent: bool) {
        if transparent {
            self.transparent.push(id);
        } else {
            self.opaque.push(id);
        }
    }
}
