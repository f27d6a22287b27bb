//! Recording backend without a GPU context
//!
//! Assigns handles, reflects uniform declarations from shader source and
//! records every call, so renderer behavior can be observed and asserted on.

use std::collections::{HashMap, HashSet};

use crate::foundation::math::Color;
use crate::render::geometry::{Primitive, VertexAttribute};
use crate::render::material::Blending;
use crate::render::uniform::{UniformType, UniformValue};

use super::{
    ActiveUniform, BackendError, BackendResult, BufferHandle, Capability, GraphicsBackend, PolygonMode,
    ProgramHandle, TextureHandle, VertexArrayHandle,
};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// `clear`
    Clear {
        /// Color buffer cleared
        color: bool,
        /// Depth buffer cleared
        depth: bool,
    },
    /// `set_clear_color`
    SetClearColor(Color),
    /// `set_viewport`
    SetViewport(u32, u32),
    /// `enable`
    Enable(Capability),
    /// `disable`
    Disable(Capability),
    /// `set_depth_mask`
    DepthMask(bool),
    /// `set_polygon_offset`
    PolygonOffset(f32, f32),
    /// `set_polygon_mode`
    PolygonMode(PolygonMode),
    /// `set_blend_mode`
    BlendMode(Blending),
    /// `create_program`
    CreateProgram(ProgramHandle),
    /// `delete_program`
    DeleteProgram(ProgramHandle),
    /// `use_program`
    UseProgram(ProgramHandle),
    /// `upload_uniform`
    UploadUniform(i32, UniformValue),
    /// `upload_uniform_block`
    UploadUniformBlock(String),
    /// `create_vertex_array`
    CreateVertexArray(VertexArrayHandle),
    /// `bind_vertex_array`
    BindVertexArray(VertexArrayHandle),
    /// `delete_vertex_array`
    DeleteVertexArray(VertexArrayHandle),
    /// `create_buffer`
    CreateBuffer(BufferHandle),
    /// `update_buffer`
    UpdateBuffer(BufferHandle),
    /// `bind_instance_buffers`
    BindInstanceBuffers(BufferHandle, BufferHandle),
    /// `delete_buffer`
    DeleteBuffer(BufferHandle),
    /// `create_texture`
    CreateTexture(TextureHandle),
    /// `bind_texture`
    BindTexture(u32, TextureHandle),
    /// `delete_texture`
    DeleteTexture(TextureHandle),
    /// `draw_arrays` / `draw_elements`
    Draw {
        /// Topology
        primitive: Primitive,
        /// Vertex or index count
        count: usize,
        /// Instance count
        instances: usize,
        /// Whether indices were used
        indexed: bool,
    },
}

/// Backend that records calls instead of talking to a GPU
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    calls: Vec<BackendCall>,
    next_handle: u32,
    programs: HashMap<ProgramHandle, Vec<ActiveUniform>>,
    vertex_arrays: HashSet<VertexArrayHandle>,
    buffers: HashSet<BufferHandle>,
    textures: HashSet<TextureHandle>,
    uniform_blocks: HashMap<String, Vec<u8>>,
}

impl HeadlessBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call since creation or the last [`HeadlessBackend::clear_calls`]
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Forget recorded calls
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Count recorded calls matching a predicate
    pub fn count_calls(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Number of recorded uniform uploads
    pub fn uniform_upload_count(&self) -> usize {
        self.count_calls(|call| matches!(call, BackendCall::UploadUniform(..)))
    }

    /// Number of recorded draws
    pub fn draw_count(&self) -> usize {
        self.count_calls(|call| matches!(call, BackendCall::Draw { .. }))
    }

    /// Number of programs created and not deleted
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Number of vertex arrays created and not deleted
    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    /// Number of buffers created and not deleted
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of textures created and not deleted
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Last data uploaded to a uniform block
    pub fn uniform_block(&self, name: &str) -> Option<&[u8]> {
        self.uniform_blocks.get(name).map(Vec::as_slice)
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn clear(&mut self, color: bool, depth: bool) {
        self.calls.push(BackendCall::Clear { color, depth });
    }

    fn set_clear_color(&mut self, color: Color) {
        self.calls.push(BackendCall::SetClearColor(color));
    }

    fn set_viewport(&mut self, _x: i32, _y: i32, width: u32, height: u32) {
        self.calls.push(BackendCall::SetViewport(width, height));
    }

    fn enable(&mut self, capability: Capability) {
        self.calls.push(BackendCall::Enable(capability));
    }

    fn disable(&mut self, capability: Capability) {
        self.calls.push(BackendCall::Disable(capability));
    }

    fn set_depth_mask(&mut self, enabled: bool) {
        self.calls.push(BackendCall::DepthMask(enabled));
    }

    fn set_polygon_offset(&mut self, factor: f32, units: f32) {
        self.calls.push(BackendCall::PolygonOffset(factor, units));
    }

    fn set_polygon_mode(&mut self, mode: PolygonMode) {
        self.calls.push(BackendCall::PolygonMode(mode));
    }

    fn set_blend_mode(&mut self, blending: Blending) {
        self.calls.push(BackendCall::BlendMode(blending));
    }

    fn create_program(&mut self, vertex: &str, fragment: &str) -> BackendResult<ProgramHandle> {
        let mut uniforms: Vec<ActiveUniform> = Vec::new();
        for source in [vertex, fragment] {
            for (name, ty) in reflect_uniforms(source)? {
                if !uniforms.iter().any(|u| u.name == name) {
                    let location = i32::try_from(uniforms.len()).unwrap_or(i32::MAX);
                    uniforms.push(ActiveUniform { name, ty, location });
                }
            }
        }

        let handle = ProgramHandle(self.allocate());
        self.programs.insert(handle, uniforms);
        self.calls.push(BackendCall::CreateProgram(handle));
        Ok(handle)
    }

    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveUniform> {
        self.programs.get(&program).cloned().unwrap_or_default()
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.programs.remove(&program);
        self.calls.push(BackendCall::DeleteProgram(program));
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.calls.push(BackendCall::UseProgram(program));
    }

    fn upload_uniform(&mut self, location: i32, value: &UniformValue) {
        self.calls.push(BackendCall::UploadUniform(location, *value));
    }

    fn upload_uniform_block(&mut self, name: &str, data: &[u8]) {
        self.uniform_blocks.insert(name.to_string(), data.to_vec());
        self.calls.push(BackendCall::UploadUniformBlock(name.to_string()));
    }

    fn create_vertex_array(
        &mut self,
        vertices: &[f32],
        _indices: &[u32],
        attributes: &[VertexAttribute],
    ) -> BackendResult<VertexArrayHandle> {
        if vertices.is_empty() || attributes.is_empty() {
            return Err(BackendError::ResourceCreation("vertex array without data".to_string()));
        }
        let handle = VertexArrayHandle(self.allocate());
        self.vertex_arrays.insert(handle);
        self.calls.push(BackendCall::CreateVertexArray(handle));
        Ok(handle)
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.calls.push(BackendCall::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.vertex_arrays.remove(&vertex_array);
        self.calls.push(BackendCall::DeleteVertexArray(vertex_array));
    }

    fn create_buffer(&mut self, _data: &[f32]) -> BackendResult<BufferHandle> {
        let handle = BufferHandle(self.allocate());
        self.buffers.insert(handle);
        self.calls.push(BackendCall::CreateBuffer(handle));
        Ok(handle)
    }

    fn update_buffer(&mut self, buffer: BufferHandle, _data: &[f32]) {
        self.calls.push(BackendCall::UpdateBuffer(buffer));
    }

    fn bind_instance_buffers(&mut self, transforms: BufferHandle, colors: BufferHandle) {
        self.calls.push(BackendCall::BindInstanceBuffers(transforms, colors));
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.buffers.remove(&buffer);
        self.calls.push(BackendCall::DeleteBuffer(buffer));
    }

    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> BackendResult<TextureHandle> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(BackendError::ResourceCreation(format!(
                "texture {width}x{height} needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        let handle = TextureHandle(self.allocate());
        self.textures.insert(handle);
        self.calls.push(BackendCall::CreateTexture(handle));
        Ok(handle)
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.calls.push(BackendCall::BindTexture(unit, texture));
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
        self.calls.push(BackendCall::DeleteTexture(texture));
    }

    fn draw_arrays(&mut self, primitive: Primitive, count: usize, instances: usize) {
        self.calls.push(BackendCall::Draw { primitive, count, instances, indexed: false });
    }

    fn draw_elements(&mut self, primitive: Primitive, count: usize, instances: usize) {
        self.calls.push(BackendCall::Draw { primitive, count, instances, indexed: true });
    }
}

/// Collect `uniform <type> <name>;` declarations from the active
/// preprocessor branches of a shader.
///
/// Understands `#define`, `#ifdef`, `#ifndef`, `#if NAME > N`, `#else`,
/// `#endif` and `#error`. Uniform blocks are skipped.
fn reflect_uniforms(source: &str) -> BackendResult<Vec<(String, UniformType)>> {
    let mut defines: HashMap<&str, &str> = HashMap::new();
    let mut branches: Vec<bool> = Vec::new();
    let mut in_block = false;
    let mut found = Vec::new();

    for line in source.lines().map(str::trim) {
        let active = branches.iter().all(|b| *b);
        let mut words = line.split_whitespace();
        match words.next() {
            Some("#ifdef") => branches.push(words.next().is_some_and(|n| defines.contains_key(n))),
            Some("#ifndef") => branches.push(!words.next().is_some_and(|n| defines.contains_key(n))),
            Some("#if") => {
                let name = words.next().unwrap_or_default();
                let op = words.next();
                let rhs = words.next().and_then(|v| v.parse::<i64>().ok());
                let lhs = defines.get(name).and_then(|v| v.parse::<i64>().ok());
                branches.push(match (lhs, op, rhs) {
                    (Some(l), Some(">"), Some(r)) => l > r,
                    (Some(l), Some("=="), Some(r)) => l == r,
                    _ => defines.contains_key(name),
                });
            }
            Some("#else") => {
                if let Some(last) = branches.last_mut() {
                    *last = !*last;
                }
            }
            Some("#endif") => {
                branches.pop();
            }
            Some("#define") if active => {
                if let Some(name) = words.next() {
                    defines.insert(name, words.next().unwrap_or(""));
                }
            }
            Some("#error") if active => {
                return Err(BackendError::CompileFailed(line.to_string()));
            }
            Some("uniform") if active => {
                if line.contains('{') {
                    in_block = !line.contains('}');
                    continue;
                }
                let tokens: Vec<&str> = words
                    .map(|w| w.trim_end_matches(';'))
                    .filter(|w| !matches!(*w, "lowp" | "mediump" | "highp" | ""))
                    .collect();
                if let [ty, name] = tokens.as_slice() {
                    if let Some(ty) = UniformType::from_glsl(ty) {
                        found.push(((*name).to_string(), ty));
                    }
                }
            }
            _ if in_block && line.contains('}') => in_block = false,
            _ => {}
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflection_follows_active_branches() {
        let source = "
            #define USE_FOG
            #define NUM_LIGHTS 0
            uniform mat4 u_Model;
            uniform highp float u_Opacity;
            #ifdef USE_FOG
            uniform vec3 u_FogColor;
            #else
            uniform vec3 u_Unused;
            #endif
            #if NUM_LIGHTS > 0
            uniform vec3 u_AmbientLight;
            #endif
            layout(std140) uniform ub_Lights {
                vec4 data;
            };
        ";
        let names: Vec<String> = reflect_uniforms(source).unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["u_Model", "u_Opacity", "u_FogColor"]);
    }

    #[test]
    fn test_error_directive_fails_compilation() {
        let mut backend = HeadlessBackend::new();
        let result = backend.create_program("#error missing feature\n", "");
        assert!(matches!(result, Err(BackendError::CompileFailed(_))));
        assert_eq!(backend.live_programs(), 0);
    }

    #[test]
    fn test_uniforms_are_merged_across_stages() {
        let mut backend = HeadlessBackend::new();
        let program = backend
            .create_program("uniform mat4 u_Model;\n", "uniform mat4 u_Model;\nuniform float u_Opacity;\n")
            .unwrap();
        let uniforms = backend.active_uniforms(program);
        assert_eq!(uniforms.len(), 2);
        assert_eq!(uniforms[1].location, 1);
    }
}
