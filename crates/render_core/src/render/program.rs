//! Compiled programs and the per-variant program cache
//!
//! Each program keeps one [`UniformSlot`] per reflected uniform, so a value
//! that did not change since the last draw never reaches the backend. The
//! cache is keyed by [`ShaderVariantKey::hash`] and bounded by a capacity;
//! the least recently used program is deleted when a new variant needs room.

use std::collections::HashMap;

use super::backend::{GraphicsBackend, ProgramHandle};
use super::material::Material;
use super::shader::{ShaderLibrary, ShaderVariantKey};
use super::uniform::{Uniform, UniformError, UniformSlot, UniformValue};

/// A linked program plus its uniform slots
#[derive(Debug)]
pub struct CompiledProgram {
    handle: Option<ProgramHandle>,
    uniforms: HashMap<String, UniformSlot>,
    last_used: u64,
}

impl CompiledProgram {
    /// Wrap a linked program, reflecting its active uniforms
    pub fn from_backend<B: GraphicsBackend + ?Sized>(handle: ProgramHandle, backend: &B) -> Self {
        let uniforms = backend
            .active_uniforms(handle)
            .into_iter()
            .map(|uniform| (uniform.name, UniformSlot::new(uniform.location, uniform.ty)))
            .collect();
        Self { handle: Some(handle), uniforms, last_used: 0 }
    }

    /// Placeholder for a variant that failed to build
    pub fn invalid() -> Self {
        Self { handle: None, uniforms: HashMap::new(), last_used: 0 }
    }

    /// Whether the program can be drawn with
    pub const fn is_valid(&self) -> bool {
        self.handle.is_some()
    }

    /// Backend handle, `None` when invalid
    pub const fn handle(&self) -> Option<ProgramHandle> {
        self.handle
    }

    /// Whether the program declares an active uniform with this name
    pub fn has_uniform(&self, name: &str) -> bool {
        self.uniforms.contains_key(name)
    }

    /// Slot of one uniform
    pub fn uniform(&self, name: &str) -> Option<&UniformSlot> {
        self.uniforms.get(name)
    }

    /// Store a uniform value. Equal values are a no-op.
    /// Returns whether the slot changed.
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> Result<bool, UniformError> {
        self.uniforms
            .get_mut(name)
            .ok_or_else(|| UniformError::NotFound(name.to_string()))?
            .set(name, value)
    }

    /// Store a built-in uniform if the program declares it
    pub fn set_builtin(&mut self, uniform: Uniform, value: impl Into<UniformValue>) -> bool {
        let name = uniform.name();
        let Some(slot) = self.uniforms.get_mut(name) else {
            return false;
        };
        match slot.set(name, value.into()) {
            Ok(changed) => changed,
            Err(e) => {
                log::error!("{e}");
                false
            }
        }
    }

    /// Upload every dirty slot. Returns the number of uploads.
    pub fn update_uniforms<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) -> usize {
        let mut uploads = 0;
        for slot in self.uniforms.values_mut() {
            if slot.upload_if_needed(backend) {
                uploads += 1;
            }
        }
        uploads
    }
}

/// Variant hash to program map with least-recently-used eviction
#[derive(Debug)]
pub struct ProgramCache {
    library: ShaderLibrary,
    programs: HashMap<u64, CompiledProgram>,
    capacity: usize,
    clock: u64,
    compile_count: usize,
    evicted: Vec<ProgramHandle>,
}

impl ProgramCache {
    /// Create a cache holding at most `capacity` programs (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            library: ShaderLibrary::new(),
            programs: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
            compile_count: 0,
            evicted: Vec::new(),
        }
    }

    /// Shader sources and snippets
    pub const fn library(&self) -> &ShaderLibrary {
        &self.library
    }

    /// Add or replace an include snippet.
    ///
    /// Snippet bodies are not part of the variant key, so every cached
    /// program is deleted and rebuilt on its next request.
    pub fn register_snippet<B: GraphicsBackend + ?Sized>(
        &mut self,
        name: impl Into<String>,
        body: impl Into<String>,
        backend: &mut B,
    ) {
        self.library.register_snippet(name, body);
        if !self.programs.is_empty() {
            log::debug!("Shader snippets changed, dropping {} cached programs", self.programs.len());
            self.clear(backend);
        }
    }

    /// Program for a variant, built on first request.
    ///
    /// A variant that fails to assemble, compile or link is cached as an
    /// invalid program and is not attempted again while it stays cached.
    pub fn get_program<B: GraphicsBackend + ?Sized>(
        &mut self,
        key: &ShaderVariantKey,
        material: &Material,
        backend: &mut B,
    ) -> &mut CompiledProgram {
        let hash = key.hash();
        self.clock += 1;

        if !self.programs.contains_key(&hash) {
            if self.programs.len() >= self.capacity {
                self.evict_least_recent(backend);
            }
            let program = self.build(key, material, backend);
            self.programs.insert(hash, program);
        }

        let program = self.programs.entry(hash).or_insert_with(CompiledProgram::invalid);
        program.last_used = self.clock;
        program
    }

    /// Cached program for a variant, without building or touching recency
    pub fn program_mut(&mut self, key: &ShaderVariantKey) -> Option<&mut CompiledProgram> {
        self.programs.get_mut(&key.hash())
    }

    /// Programs deleted by eviction since the last call
    pub fn take_evicted(&mut self) -> Vec<ProgramHandle> {
        std::mem::take(&mut self.evicted)
    }

    /// Number of compile attempts so far
    pub const fn compile_count(&self) -> usize {
        self.compile_count
    }

    /// Number of cached programs, valid or not
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Maximum number of cached programs
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether a variant is cached
    pub fn contains(&self, key: &ShaderVariantKey) -> bool {
        self.programs.contains_key(&key.hash())
    }

    /// Delete every program
    pub fn clear<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) {
        for (_, program) in self.programs.drain() {
            if let Some(handle) = program.handle {
                backend.delete_program(handle);
                self.evicted.push(handle);
            }
        }
    }

    fn build<B: GraphicsBackend + ?Sized>(
        &mut self,
        key: &ShaderVariantKey,
        material: &Material,
        backend: &mut B,
    ) -> CompiledProgram {
        self.compile_count += 1;

        let source = match self.library.shader_source(key, material) {
            Ok(source) => source,
            Err(e) => {
                log::error!("Failed to assemble shader variant {:#x}: {e}", key.hash());
                return CompiledProgram::invalid();
            }
        };

        match backend.create_program(&source.vertex, &source.fragment) {
            Ok(handle) => {
                log::debug!("Compiled shader variant {:#x} as program {}", key.hash(), handle.0);
                CompiledProgram::from_backend(handle, backend)
            }
            Err(e) => {
                log::error!("Failed to build shader variant {:#x}: {e}", key.hash());
                CompiledProgram::invalid()
            }
        }
    }

    fn evict_least_recent<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) {
        let Some(oldest) = self.programs.iter().min_by_key(|(_, p)| p.last_used).map(|(hash, _)| *hash) else {
            return;
        };
        if let Some(program) = self.programs.remove(&oldest) {
            log::debug!("Evicting shader variant {oldest:#x}");
            if let Some(handle) = program.handle {
                backend.delete_program(handle);
                self.evicted.push(handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Color, Mat4};
    use crate::render::backend::{BackendCall, HeadlessBackend};
    use crate::render::lights::LightCounts;
    use crate::render::material::ShaderMaterial;
    use crate::scene::Scene;

    fn key(material: &Material) -> ShaderVariantKey {
        ShaderVariantKey::resolve(material, &LightCounts::default(), &Scene::new())
    }

    #[test]
    fn test_each_variant_compiles_once() {
        let mut backend = HeadlessBackend::new();
        let mut cache = ProgramCache::new(8);
        let flat = Material::flat(Color::WHITE);
        let phong = Material::phong(Color::WHITE);

        for _ in 0..3 {
            assert!(cache.get_program(&key(&flat), &flat, &mut backend).is_valid());
            assert!(cache.get_program(&key(&phong), &phong, &mut backend).is_valid());
        }
        assert_eq!(cache.compile_count(), 2);
        assert_eq!(backend.live_programs(), 2);
    }

    #[test]
    fn test_least_recently_used_program_is_evicted() {
        let mut backend = HeadlessBackend::new();
        let mut cache = ProgramCache::new(2);
        let flat = Material::flat(Color::WHITE);
        let phong = Material::phong(Color::WHITE);
        let two_sided = Material::flat(Color::WHITE).with_two_sided(true);

        let flat_handle = cache.get_program(&key(&flat), &flat, &mut backend).handle();
        cache.get_program(&key(&phong), &phong, &mut backend);
        cache.get_program(&key(&phong), &phong, &mut backend);
        cache.get_program(&key(&two_sided), &two_sided, &mut backend);

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&key(&flat)));
        assert_eq!(cache.take_evicted(), flat_handle.into_iter().collect::<Vec<_>>());
        assert!(cache.take_evicted().is_empty());
        assert_eq!(backend.live_programs(), 2);
        assert_eq!(backend.count_calls(|c| matches!(c, BackendCall::DeleteProgram(_))), 1);
    }

    #[test]
    fn test_failed_variant_is_cached_as_invalid() {
        let mut backend = HeadlessBackend::new();
        let mut cache = ProgramCache::new(4);
        let broken = Material::shader(ShaderMaterial::new(
            "#version 330 core\n#pragma inject_attributes\n#error not supported\n",
            "#version 330 core\n#pragma inject_attributes\n",
        ));

        assert!(!cache.get_program(&key(&broken), &broken, &mut backend).is_valid());
        assert!(!cache.get_program(&key(&broken), &broken, &mut backend).is_valid());
        assert_eq!(cache.compile_count(), 1);
        assert_eq!(backend.live_programs(), 0);
    }

    #[test]
    fn test_edited_shader_source_builds_a_new_program() {
        let mut backend = HeadlessBackend::new();
        let mut cache = ProgramCache::new(4);
        let vertex = "#version 330 core\n#pragma inject_attributes\nvoid main() {}\n";
        let original = ShaderMaterial::new(vertex, "#version 330 core\n#pragma inject_attributes\nvoid main() {}\n");

        let same = original.clone();
        let mut edited = original.clone();
        edited.set_fragment_source(
            "#version 330 core\n#pragma inject_attributes\nuniform float u_Extra;\nvoid main() {}\n",
        );

        let a = Material::shader(original);
        let b = Material::shader(same);
        let c = Material::shader(edited);
        assert_eq!(key(&a).hash(), key(&b).hash());
        assert_ne!(key(&a).hash(), key(&c).hash());

        assert!(!cache.get_program(&key(&a), &a, &mut backend).has_uniform("u_Extra"));
        assert!(!cache.get_program(&key(&b), &b, &mut backend).has_uniform("u_Extra"));
        assert!(cache.get_program(&key(&c), &c, &mut backend).has_uniform("u_Extra"));
        assert_eq!(cache.compile_count(), 2);
    }

    #[test]
    fn test_registering_a_snippet_rebuilds_programs() {
        let mut backend = HeadlessBackend::new();
        let mut cache = ProgramCache::new(4);
        let material = Material::shader(ShaderMaterial::new(
            "#version 330 core\n#pragma inject_attributes\n#include \"tint.glsl\"\nvoid main() {}\n",
            "#version 330 core\n#pragma inject_attributes\nvoid main() {}\n",
        ));

        cache.register_snippet("tint.glsl", "vec3 tint() { return vec3(1.0); }", &mut backend);
        let first = cache.get_program(&key(&material), &material, &mut backend).handle();
        assert!(!cache.get_program(&key(&material), &material, &mut backend).has_uniform("u_Tint"));

        cache.register_snippet("tint.glsl", "uniform vec3 u_Tint;\nvec3 tint() { return u_Tint; }", &mut backend);
        assert!(cache.is_empty());
        assert_eq!(cache.take_evicted(), first.into_iter().collect::<Vec<_>>());
        assert!(cache.get_program(&key(&material), &material, &mut backend).has_uniform("u_Tint"));
        assert_eq!(cache.compile_count(), 2);
        assert_eq!(backend.live_programs(), 1);
    }

    #[test]
    fn test_uniform_diffing() {
        let mut backend = HeadlessBackend::new();
        let mut cache = ProgramCache::new(4);
        let flat = Material::flat(Color::WHITE);
        let program = cache.get_program(&key(&flat), &flat, &mut backend);

        assert_eq!(program.set_uniform("u_Model", Mat4::identity().into()), Ok(true));
        assert_eq!(program.set_uniform("u_Model", Mat4::identity().into()), Ok(false));
        assert!(program.set_builtin(Uniform::Opacity, 1.0_f32));
        assert!(!program.set_builtin(Uniform::DiffuseColor, Color::WHITE));

        assert_eq!(program.update_uniforms(&mut backend), 2);
        assert_eq!(program.update_uniforms(&mut backend), 0);
        assert_eq!(backend.uniform_upload_count(), 2);
    }

    #[test]
    fn test_unknown_uniform_is_an_error() {
        let mut backend = HeadlessBackend::new();
        let mut cache = ProgramCache::new(4);
        let flat = Material::flat(Color::WHITE);
        let program = cache.get_program(&key(&flat), &flat, &mut backend);

        assert_eq!(
            program.set_uniform("u_Missing", 1.0_f32.into()),
            Err(UniformError::NotFound("u_Missing".to_string()))
        );
        assert!(!program.has_uniform("u_FogColor"));
    }
}
