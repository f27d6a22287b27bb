//! Scene management system
//!
//! ```text
//! Scene (arena of Nodes, root, fog, event bus)
//!      ↓ update_transform_hierarchy
//! world transforms
//!      ↓ process_scene (only when topology changed)
//! RenderLists (opaque / transparent / lights)
//! ```

mod camera;
mod node;
mod render_lists;
#[allow(clippy::module_inception)]
mod scene;
mod transform;

pub use camera::{Camera, Projection};
pub use node::{Node, NodeId, NodeKind};
pub use render_lists::RenderLists;
pub use scene::{Fog, Scene, SceneError};
pub use transform::Transform;
