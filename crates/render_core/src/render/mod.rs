//! # Rendering System
//!
//! Forward rendering on top of an immediate-mode graphics backend.
//!
//! ## Architecture
//!
//! - **Resources**: [`Geometry`] (with built-in shapes such as
//!   [`Geometry::cube`]), [`Texture2D`], [`Material`], [`Mesh`],
//!   [`InstancedMesh`] and [`Light`] describe what to draw
//! - **Shader variants**: [`shader`] derives a permutation key per draw and
//!   assembles its source
//! - **Caches**: [`ProgramCache`], [`BufferCache`], [`TextureCache`] and
//!   [`StateCache`] keep backend calls to what actually changed
//! - **Renderer**: [`Renderer`] ties scene, camera and caches together once
//!   per frame
//!
//! ## Threading
//!
//! Everything here lives on the thread that owns the graphics context.
//! Nothing is `Send`; resources use `Rc` and interior mutability.

pub mod backend;
pub mod binding;
pub mod geometry;
pub mod light;
pub mod lights;
pub mod material;
pub mod mesh;
pub mod program;
pub mod renderer;
pub mod resource;
pub mod shader;
mod shapes;
pub mod state;
pub mod texture;
pub mod uniform;

pub use backend::{BackendError, GraphicsBackend, HeadlessBackend};
pub use binding::{BindError, BufferCache, TextureCache};
pub use geometry::{AttributeKind, Geometry, Primitive, VertexAttribute};
pub use light::{Attenuation, Light, LightKind};
pub use lights::{LightAggregator, LightCounts, UniformLight};
pub use material::{Blending, DepthBias, Material, MaterialFlags, MaterialKind, ShaderMaterial};
pub use mesh::{InstanceError, InstancedMesh, Mesh};
pub use program::{CompiledProgram, ProgramCache};
pub use renderer::{FrameStats, RenderError, Renderer, Viewport};
pub use resource::{Disposal, ResourceId};
pub use shader::{ShaderError, ShaderLibrary, ShaderSource, ShaderVariantKey};
pub use state::StateCache;
pub use texture::Texture2D;
pub use uniform::{Uniform, UniformError, UniformSlot, UniformType, UniformValue};
