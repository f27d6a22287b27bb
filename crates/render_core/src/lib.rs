//! # Render Core
//!
//! Scene graph, shader variant and resource caching core of a forward
//! renderer. The graphics API sits behind [`render::GraphicsBackend`];
//! [`render::HeadlessBackend`] records calls instead of drawing and is what
//! the tests run against.
//!
//! ## Frame
//!
//! ```text
//! Scene ── update_transform_hierarchy ──> world transforms
//!       ── process_scene ──> RenderLists (opaque / transparent / lights)
//! Renderer::render
//!   lights   -> LightAggregator -> ub_Lights
//!   per mesh -> ShaderVariantKey -> ProgramCache -> uniform diff
//!            -> BufferCache / TextureCache -> StateCache -> draw
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use render_core::prelude::*;
//!
//! let mut renderer = Renderer::new(HeadlessBackend::new(), RendererConfig::new()).unwrap();
//! let mut scene = Scene::new();
//! let mut camera = Camera::perspective(60.0, 4.0 / 3.0, 0.1, 100.0);
//! camera.transform_mut().set_position(Vec3::new(0.0, 0.0, 5.0));
//!
//! let triangle = Rc::new(Geometry::new(
//!     vec![-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0],
//!     vec![VertexAttribute::position()],
//! ));
//! scene.add_to_root(Node::mesh(Mesh::new(triangle, Material::flat(Color::WHITE))));
//!
//! let stats = renderer.render(&mut scene, &mut camera);
//! assert_eq!(stats.rendered, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod core;
pub mod events;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod spatial;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        assets::{LoadError, ResourceLoader, TextureData, TextureLoader},
        core::RendererConfig,
        events::{Event, EventBus, EventHandler, SceneEvent, WindowEvent},
        foundation::math::{Color, Mat4, Vec2, Vec3},
        render::{
            FrameStats, Geometry, GraphicsBackend, HeadlessBackend, InstancedMesh, Light, Material,
            Mesh, RenderError, Renderer, ShaderMaterial, Texture2D, VertexAttribute,
        },
        scene::{Camera, Fog, Node, NodeId, Projection, Scene, Transform},
        spatial::{BoundingBox, BoundingSphere, Frustum},
    };
}
