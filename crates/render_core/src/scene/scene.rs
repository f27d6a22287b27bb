//! Scene graph container
//!
//! Owns every node in a generational arena, propagates world transforms,
//! and caches the render lists until the topology changes.

use slotmap::SlotMap;

use crate::events::{Event, EventBus, SceneEvent};
use crate::foundation::math::{Color, Mat4, Vec3};

use super::{Node, NodeId, RenderLists};

/// Scene graph errors
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneError {
    /// The handle does not resolve to a live node
    #[error("Node {0:?} does not exist")]
    NodeNotFound(NodeId),

    /// Attaching would make a node its own ancestor
    #[error("Cannot attach {child:?} under its own descendant {parent:?}")]
    CyclicParent {
        /// Node being attached
        child: NodeId,
        /// Requested parent
        parent: NodeId,
    },

    /// The root node cannot be re-parented or removed
    #[error("The scene root cannot be re-parented or removed")]
    RootImmutable,
}

/// Distance fog applied to materials that opt in
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fog {
    /// Fog density grows linearly between `near` and `far`
    Linear {
        /// Fog color
        color: Color,
        /// Distance where fog starts
        near: f32,
        /// Distance of full fog
        far: f32,
    },
    /// Fog density grows exponentially with distance
    Exponential {
        /// Fog color
        color: Color,
        /// Density factor
        density: f32,
    },
}

impl Fog {
    /// Value written to the fog type uniform
    pub const fn type_index(&self) -> i32 {
        match self {
            Self::Linear { .. } => 0,
            Self::Exponential { .. } => 1,
        }
    }

    /// Fog color
    pub const fn color(&self) -> Color {
        match self {
            Self::Linear { color, .. } | Self::Exponential { color, .. } => *color,
        }
    }
}

/// Scene graph with a root node, fog settings and cached render lists
#[derive(Debug)]
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
    root: NodeId,
    fog: Option<Fog>,
    render_lists: RenderLists,
    topology_dirty: bool,
    revision_counter: u64,
    events: EventBus,
}

impl Scene {
    /// Create a scene containing only its root
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::group().with_name("scene"));
        Self {
            nodes,
            root,
            fog: None,
            render_lists: RenderLists::new(),
            topology_dirty: true,
            revision_counter: 0,
            events: EventBus::new(),
        }
    }

    /// Root node handle
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if only the root exists
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Whether a handle still resolves
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Look up a node
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a node mutably.
    ///
    /// Changing a material's transparency through this handle requires
    /// [`Scene::invalidate_render_lists`] to be reclassified.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Iterate over all live nodes
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter()
    }

    /// First node with the given name, in depth-first order
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.nodes.get(id)?;
            if node.name == name {
                return Some(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Fog settings
    pub const fn fog(&self) -> Option<&Fog> {
        self.fog.as_ref()
    }

    /// Enable or disable fog
    pub fn set_fog(&mut self, fog: Option<Fog>) {
        self.fog = fog;
    }

    /// Event bus carrying this scene's notifications
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Mutable event bus, for subscribing and publishing
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Insert a node as the last child of `parent`
    pub fn add(&mut self, parent: NodeId, node: Node) -> Result<NodeId, SceneError> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::NodeNotFound(parent));
        }
        Ok(self.insert(parent, node))
    }

    /// Insert a node directly under the root
    pub fn add_to_root(&mut self, node: Node) -> NodeId {
        self.insert(self.root, node)
    }

    fn insert(&mut self, parent: NodeId, mut node: Node) -> NodeId {
        node.parent = None;
        node.children.clear();
        let id = self.nodes.insert(node);
        self.link(parent, id);
        id
    }

    /// Move an existing node (and its subtree) under a new parent
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        if child == self.root {
            return Err(SceneError::RootImmutable);
        }
        for id in [parent, child] {
            if !self.nodes.contains_key(id) {
                return Err(SceneError::NodeNotFound(id));
            }
        }
        if parent == child || self.is_descendant(child, parent) {
            return Err(SceneError::CyclicParent { child, parent });
        }

        self.unlink(child);
        self.link(parent, child);
        Ok(())
    }

    /// Destroy a node together with its subtree, returning the node itself
    pub fn remove(&mut self, id: NodeId) -> Result<Node, SceneError> {
        if id == self.root {
            return Err(SceneError::RootImmutable);
        }
        if !self.nodes.contains_key(id) {
            return Err(SceneError::NodeNotFound(id));
        }

        let parent = self.unlink(id);
        let mut stack: Vec<NodeId> = self.nodes.get(id).map(|n| n.children.clone()).unwrap_or_default();
        while let Some(descendant) = stack.pop() {
            if let Some(node) = self.nodes.remove(descendant) {
                stack.extend(node.children);
            }
        }

        let mut node = self.nodes.remove(id).ok_or(SceneError::NodeNotFound(id))?;
        node.children.clear();
        self.topology_dirty = true;
        if let Some(parent) = parent {
            self.events.publish(&Event::Scene(SceneEvent::NodeRemoved { node: id, parent }));
        }
        Ok(node)
    }

    /// Destroy every child of a node, returning how many direct children
    /// were removed
    pub fn remove_all_children(&mut self, id: NodeId) -> Result<usize, SceneError> {
        let children = self
            .nodes
            .get(id)
            .map(|n| n.children.clone())
            .ok_or(SceneError::NodeNotFound(id))?;
        for child in &children {
            self.remove(*child)?;
        }
        Ok(children.len())
    }

    /// True if `node` lies strictly below `ancestor`
    pub fn is_descendant(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Whether the render lists need rebuilding
    pub const fn is_topology_dirty(&self) -> bool {
        self.topology_dirty
    }

    /// Force the next [`Scene::process_scene`] to reclassify every node
    pub fn invalidate_render_lists(&mut self) {
        self.topology_dirty = true;
    }

    /// Render lists as of the last rebuild
    pub const fn render_lists(&self) -> &RenderLists {
        &self.render_lists
    }

    /// Rebuild the render lists if the topology changed since the last call
    pub fn process_scene(&mut self) -> &RenderLists {
        if self.topology_dirty {
            self.render_lists.rebuild(&self.nodes, self.root);
            self.topology_dirty = false;
        }
        &self.render_lists
    }

    /// Top-down propagation of world transforms through the whole graph.
    ///
    /// A node is recomputed when its local transform changed or when its
    /// parent's world transform was recomputed since it was last derived.
    pub fn update_transform_hierarchy(&mut self) {
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            self.refresh_world(id);
            if let Some(node) = self.nodes.get(id) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
    }

    /// World transform of a single node, refreshing only its ancestor chain
    pub fn world_transform(&mut self, id: NodeId) -> Option<Mat4> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            current = self.nodes.get(node_id)?.parent;
            chain.push(node_id);
        }
        for node_id in chain.iter().rev() {
            self.refresh_world(*node_id);
        }
        self.nodes.get(id).map(|n| n.world)
    }

    /// World-space position of a single node
    pub fn world_position(&mut self, id: NodeId) -> Option<Vec3> {
        self.world_transform(id)
            .map(|world| world.fixed_view::<3, 1>(0, 3).into_owned())
    }

    /// Recompute one node from its parent's current world transform.
    /// Both propagation paths go through here so they agree exactly.
    fn refresh_world(&mut self, id: NodeId) {
        let parent_state = self
            .nodes
            .get(id)
            .and_then(|n| n.parent)
            .and_then(|p| self.nodes.get(p))
            .map(|p| (p.world, p.world_revision));
        let parent_revision = parent_state.map_or(0, |(_, revision)| revision);

        let Some(node) = self.nodes.get_mut(id) else { return };
        let stale = node.transform.is_touched() || node.parent_revision != parent_revision;
        if node.has_world() && (!stale || !node.transform_auto_update) {
            return;
        }

        let local = node.transform.matrix();
        node.world = match parent_state {
            Some((parent_world, _)) => parent_world * local,
            None => local,
        };
        node.transform.reset_touched();
        node.parent_revision = parent_revision;
        self.revision_counter += 1;
        node.world_revision = self.revision_counter;
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
            node.transform.touch();
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
        self.topology_dirty = true;
        self.events.publish(&Event::Scene(SceneEvent::NodeAdded { node: child, parent }));
    }

    fn unlink(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get_mut(child)?.parent.take()?;
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.retain(|id| *id != child);
        }
        self.topology_dirty = true;
        Some(parent)
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventHandler, EventTopic};
    use crate::foundation::math::Euler;
    use crate::render::geometry::{Geometry, VertexAttribute};
    use crate::render::light::Light;
    use crate::render::material::Material;
    use crate::render::mesh::Mesh;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn mesh_node(transparent: bool) -> Node {
        let geometry = Rc::new(Geometry::new(vec![0.0; 9], vec![VertexAttribute::position()]));
        let material = Material::flat(Color::WHITE).with_transparent(transparent);
        Node::mesh(Mesh::new(geometry, material))
    }

    fn light_node() -> Node {
        Node::light(Light::point(Color::WHITE, 1.0))
    }

    /// root -> a -> b -> c, with c having a sibling d under b
    fn chain(scene: &mut Scene) -> [NodeId; 4] {
        let a = scene.add_to_root(Node::group().with_position(Vec3::new(1.0, 0.0, 0.0)));
        let b = scene.add(a, Node::group()).unwrap();
        let c = scene.add(b, Node::group().with_position(Vec3::new(0.0, 0.0, -2.0))).unwrap();
        let d = scene.add(b, Node::group()).unwrap();
        [a, b, c, d]
    }

    fn mutate(scene: &mut Scene, [a, b, c, _]: [NodeId; 4]) {
        scene.get_mut(a).unwrap().transform_mut().rotate(Euler::new(0.3, 0.7, -0.2));
        scene.get_mut(b).unwrap().transform_mut().translate(Vec3::new(0.5, -1.5, 2.0));
        scene.get_mut(b).unwrap().transform_mut().scale_by(Vec3::new(1.0, 2.0, 0.5));
        scene.get_mut(c).unwrap().transform_mut().rotate(Euler::new(-1.0, 0.0, 0.4));
    }

    #[test]
    fn test_render_lists_partition_every_node_once() {
        let mut scene = Scene::new();
        let group = scene.add_to_root(Node::group());
        let mut opaque = Vec::new();
        let mut transparent = Vec::new();
        for i in 0..5 {
            let parent = if i % 2 == 0 { scene.root() } else { group };
            opaque.push(scene.add(parent, mesh_node(false)).unwrap());
        }
        for _ in 0..3 {
            transparent.push(scene.add(group, mesh_node(true)).unwrap());
        }
        let lights: Vec<_> = (0..4).map(|_| scene.add(group, light_node()).unwrap()).collect();

        let lists = scene.process_scene();
        assert_eq!(lists.opaque().len() + lists.transparent().len(), 8);
        assert_eq!(lists.lights().len(), 4);
        for id in &opaque {
            assert!(lists.opaque().contains(id));
        }
        for id in &transparent {
            assert!(lists.transparent().contains(id));
        }
        for id in &lights {
            assert!(lists.lights().contains(id));
        }
    }

    #[test]
    fn test_removed_node_leaves_its_bucket() {
        let mut scene = Scene::new();
        let mesh = scene.add_to_root(mesh_node(true));
        let light = scene.add_to_root(light_node());
        scene.process_scene();

        scene.remove(mesh).unwrap();
        scene.remove(light).unwrap();
        let lists = scene.process_scene();

        assert!(lists.is_empty());
        assert!(scene.get(mesh).is_none());
    }

    #[test]
    fn test_removing_parent_destroys_subtree() {
        let mut scene = Scene::new();
        let [a, b, c, d] = chain(&mut scene);
        let removed = scene.remove(b).unwrap();
        assert!(removed.children().is_empty());
        for id in [b, c, d] {
            assert!(!scene.contains(id));
        }
        assert!(scene.get(a).unwrap().children().is_empty());
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn test_transform_change_keeps_topology_clean() {
        let mut scene = Scene::new();
        let mesh = scene.add_to_root(mesh_node(false));
        scene.process_scene();
        assert!(!scene.is_topology_dirty());

        scene.get_mut(mesh).unwrap().transform_mut().translate(Vec3::x());
        scene.update_transform_hierarchy();
        assert!(!scene.is_topology_dirty());
    }

    #[test]
    fn test_world_is_parent_world_times_local() {
        let mut scene = Scene::new();
        let ids = chain(&mut scene);
        mutate(&mut scene, ids);
        scene.update_transform_hierarchy();

        for id in ids {
            let node = scene.get(id).unwrap();
            let parent = scene.get(node.parent().unwrap()).unwrap();
            let expected = parent.cached_world_transform() * node.transform().matrix();
            assert_eq!(*node.cached_world_transform(), expected);
        }
        assert_eq!(
            *scene.get(ids[0]).unwrap().cached_world_transform(),
            scene.get(ids[0]).unwrap().transform().matrix()
        );
    }

    #[test]
    fn test_top_down_and_bottom_up_agree() {
        let mut top_down = Scene::new();
        let mut bottom_up = Scene::new();
        let td = chain(&mut top_down);
        let bu = chain(&mut bottom_up);

        for round in 0..3 {
            mutate(&mut top_down, td);
            mutate(&mut bottom_up, bu);
            if round == 1 {
                top_down.update_transform_hierarchy();
                bottom_up.world_transform(bu[0]);
                mutate(&mut top_down, td);
                mutate(&mut bottom_up, bu);
            }

            top_down.update_transform_hierarchy();
            for (t, b) in td.iter().zip(bu.iter()) {
                let expected = *top_down.get(*t).unwrap().cached_world_transform();
                assert_eq!(bottom_up.world_transform(*b).unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_bottom_up_query_does_not_leave_siblings_stale() {
        let mut scene = Scene::new();
        let [_, b, c, d] = chain(&mut scene);
        scene.update_transform_hierarchy();

        scene.get_mut(b).unwrap().transform_mut().set_position(Vec3::new(0.0, 10.0, 0.0));
        let c_world = scene.world_transform(c).unwrap();
        scene.update_transform_hierarchy();

        assert_eq!(*scene.get(c).unwrap().cached_world_transform(), c_world);
        assert_relative_eq!(scene.get(d).unwrap().cached_world_position().y, 10.0);
    }

    #[test]
    fn test_frozen_node_keeps_first_world() {
        let mut scene = Scene::new();
        let parent = scene.add_to_root(Node::group());
        let mut frozen = Node::group().with_position(Vec3::new(0.0, 1.0, 0.0));
        frozen.transform_auto_update = false;
        let frozen = scene.add(parent, frozen).unwrap();
        scene.update_transform_hierarchy();
        let first = *scene.get(frozen).unwrap().cached_world_transform();

        scene.get_mut(parent).unwrap().transform_mut().translate(Vec3::new(5.0, 0.0, 0.0));
        scene.get_mut(frozen).unwrap().transform_mut().translate(Vec3::new(0.0, 3.0, 0.0));
        scene.update_transform_hierarchy();
        assert_eq!(*scene.get(frozen).unwrap().cached_world_transform(), first);
        assert_eq!(scene.world_transform(frozen).unwrap(), first);
    }

    #[test]
    fn test_reparenting_moves_world_position() {
        let mut scene = Scene::new();
        let left = scene.add_to_root(Node::group().with_position(Vec3::new(-5.0, 0.0, 0.0)));
        let right = scene.add_to_root(Node::group().with_position(Vec3::new(5.0, 0.0, 0.0)));
        let child = scene.add(left, Node::group()).unwrap();
        assert_relative_eq!(scene.world_position(child).unwrap().x, -5.0);

        scene.attach(right, child).unwrap();
        assert!(scene.get(child).unwrap().transform().is_touched());
        assert_relative_eq!(scene.world_position(child).unwrap().x, 5.0);
        assert!(scene.get(left).unwrap().children().is_empty());
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut scene = Scene::new();
        let [a, _, c, _] = chain(&mut scene);
        assert_eq!(scene.attach(c, a), Err(SceneError::CyclicParent { child: a, parent: c }));
        assert_eq!(scene.attach(a, a), Err(SceneError::CyclicParent { child: a, parent: a }));
        assert_eq!(scene.attach(a, scene.root()), Err(SceneError::RootImmutable));
        assert!(scene.is_descendant(a, c));
        assert!(!scene.is_descendant(c, a));
    }

    #[test]
    fn test_topology_events_are_published() {
        struct Counter {
            added: usize,
            removed: usize,
        }
        impl EventHandler for Counter {
            fn on_event(&mut self, event: &Event) -> bool {
                match event {
                    Event::Scene(SceneEvent::NodeAdded { .. }) => self.added += 1,
                    Event::Scene(SceneEvent::NodeRemoved { .. }) => self.removed += 1,
                    Event::Window(_) => {}
                }
                false
            }
        }

        let mut scene = Scene::new();
        let counter = Rc::new(RefCell::new(Counter { added: 0, removed: 0 }));
        scene.events_mut().subscribe(EventTopic::Scene, &counter);

        let a = scene.add_to_root(Node::group());
        scene.add(a, Node::group()).unwrap();
        scene.remove(a).unwrap();

        assert_eq!(counter.borrow().added, 2);
        assert_eq!(counter.borrow().removed, 1);
    }

    #[test]
    fn test_remove_all_children_clears_subtrees() {
        struct Removals(Vec<NodeId>);
        impl EventHandler for Removals {
            fn on_event(&mut self, event: &Event) -> bool {
                if let Event::Scene(SceneEvent::NodeRemoved { node, .. }) = event {
                    self.0.push(*node);
                }
                false
            }
        }

        let mut scene = Scene::new();
        let parent = scene.add_to_root(Node::group());
        let keep = scene.add_to_root(mesh_node(false));
        let opaque = scene.add(parent, mesh_node(false)).unwrap();
        let group = scene.add(parent, Node::group()).unwrap();
        let nested = scene.add(group, mesh_node(true)).unwrap();
        let light = scene.add(group, light_node()).unwrap();
        assert_eq!(scene.process_scene().opaque().len(), 2);

        let removals = Rc::new(RefCell::new(Removals(Vec::new())));
        scene.events_mut().subscribe(EventTopic::Scene, &removals);

        assert_eq!(scene.remove_all_children(parent), Ok(2));
        assert!(scene.contains(parent));
        assert!(scene.get(parent).unwrap().children().is_empty());
        for id in [opaque, group, nested, light] {
            assert!(!scene.contains(id));
        }
        assert_eq!(scene.len(), 3);
        assert_eq!(removals.borrow().0, vec![opaque, group]);

        let lists = scene.process_scene();
        assert_eq!(lists.opaque(), &[keep]);
        assert!(lists.transparent().is_empty());
        assert!(lists.lights().is_empty());

        assert_eq!(scene.remove_all_children(parent), Ok(0));
    }

    #[test]
    fn test_add_to_root_drops_stale_links() {
        let mut scene = Scene::new();
        let other = scene.add_to_root(Node::group());
        let mut stale = Node::group();
        stale.parent = Some(other);
        stale.children.push(other);

        let id = scene.add_to_root(stale);
        let node = scene.get(id).unwrap();
        assert_eq!(node.parent, Some(scene.root()));
        assert!(node.children().is_empty());
        assert!(!scene.is_descendant(other, id));
        assert_eq!(scene.get(scene.root()).unwrap().children(), &[other, id]);
    }

    #[test]
    fn test_find_by_name() {
        let mut scene = Scene::new();
        let a = scene.add_to_root(Node::group().with_name("ship"));
        assert_eq!(scene.find_by_name("ship"), Some(a));
        assert_eq!(scene.find_by_name("missing"), None);
    }
}
