//! Graphics backend abstraction
//!
//! The renderer drives an immediate-mode, bind-before-use state machine.
//! Everything it needs from that machine is captured by [`GraphicsBackend`];
//! the caches in this crate exist to call it as little as possible.

mod headless;

pub use headless::{BackendCall, HeadlessBackend};

use crate::foundation::math::Color;

use super::geometry::{Primitive, VertexAttribute};
use super::material::Blending;
use super::uniform::{UniformType, UniformValue};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// Handle to a vertex array with its vertex and index buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayHandle(pub u32);

/// Handle to a standalone buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Handle to a texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Global toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Depth testing
    DepthTest,
    /// Back-face culling
    CullFace,
    /// Polygon offset for filled primitives
    PolygonOffsetFill,
    /// Color blending
    Blend,
}

/// Rasterization mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PolygonMode {
    /// Filled triangles
    #[default]
    Fill,
    /// Edges only
    Line,
}

/// Active uniform reported by program reflection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    /// Declared name
    pub name: String,
    /// Declared type
    pub ty: UniformType,
    /// Location for uploads
    pub location: i32,
}

/// Backend errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// A shader stage failed to compile
    #[error("Shader compilation failed: {0}")]
    CompileFailed(String),

    /// Compiled stages failed to link
    #[error("Program link failed: {0}")]
    LinkFailed(String),

    /// A GPU object could not be created
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),
}

/// Immediate-mode graphics backend
pub trait GraphicsBackend {
    /// Clear the color and/or depth buffer
    fn clear(&mut self, color: bool, depth: bool);

    /// Set the clear color
    fn set_clear_color(&mut self, color: Color);

    /// Set the viewport rectangle
    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Enable a capability
    fn enable(&mut self, capability: Capability);

    /// Disable a capability
    fn disable(&mut self, capability: Capability);

    /// Enable or disable depth writes
    fn set_depth_mask(&mut self, enabled: bool);

    /// Set the polygon offset factor and units
    fn set_polygon_offset(&mut self, factor: f32, units: f32);

    /// Set the rasterization mode
    fn set_polygon_mode(&mut self, mode: PolygonMode);

    /// Set the blend equation and factors
    fn set_blend_mode(&mut self, blending: Blending);

    /// Compile and link a program
    fn create_program(&mut self, vertex: &str, fragment: &str) -> BackendResult<ProgramHandle>;

    /// Active uniforms of a linked program
    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveUniform>;

    /// Delete a program
    fn delete_program(&mut self, program: ProgramHandle);

    /// Make a program current
    fn use_program(&mut self, program: ProgramHandle);

    /// Upload one uniform of the current program
    fn upload_uniform(&mut self, location: i32, value: &UniformValue);

    /// Upload the contents of a named uniform block
    fn upload_uniform_block(&mut self, name: &str, data: &[u8]);

    /// Create a vertex array with interleaved vertices and optional indices
    fn create_vertex_array(
        &mut self,
        vertices: &[f32],
        indices: &[u32],
        attributes: &[VertexAttribute],
    ) -> BackendResult<VertexArrayHandle>;

    /// Bind a vertex array
    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Delete a vertex array and its buffers
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Create a per-instance attribute buffer
    fn create_buffer(&mut self, data: &[f32]) -> BackendResult<BufferHandle>;

    /// Replace the contents of a buffer
    fn update_buffer(&mut self, buffer: BufferHandle, data: &[f32]);

    /// Attach instance transform and color buffers to the bound vertex array
    fn bind_instance_buffers(&mut self, transforms: BufferHandle, colors: BufferHandle);

    /// Delete a buffer
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Create an RGBA8 texture
    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> BackendResult<TextureHandle>;

    /// Bind a texture to a texture unit
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Delete a texture
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Draw `count` vertices from the bound vertex array
    fn draw_arrays(&mut self, primitive: Primitive, count: usize, instances: usize);

    /// Draw `count` indices from the bound vertex array
    fn draw_elements(&mut self, primitive: Primitive, count: usize, instances: usize);
}
