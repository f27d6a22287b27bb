//! Base sources and snippets for every shading model

use std::collections::HashMap;

use crate::render::material::{Material, MaterialKind};

use super::assembler::ShaderAssembler;
use super::sources;
use super::variant::{ShaderKind, ShaderVariantKey};
use super::{ShaderError, ShaderSource};

/// Produces assembled source for a variant
#[derive(Debug, Clone)]
pub struct ShaderLibrary {
    snippets: HashMap<String, String>,
}

impl ShaderLibrary {
    /// Library with the built-in snippets
    pub fn new() -> Self {
        let snippets = sources::SNIPPETS
            .iter()
            .map(|(name, body)| ((*name).to_string(), (*body).to_string()))
            .collect();
        Self { snippets }
    }

    /// Add or replace an include snippet, for use by custom shader materials.
    ///
    /// Programs built from the old body are not affected; go through
    /// [`ProgramCache::register_snippet`](crate::render::ProgramCache::register_snippet)
    /// once programs exist.
    pub fn register_snippet(&mut self, name: impl Into<String>, body: impl Into<String>) {
        let name = name.into();
        if self.snippets.insert(name.clone(), body.into()).is_some() {
            log::debug!("Replaced shader snippet '{name}'");
        }
    }

    /// Whether a snippet is known
    pub fn has_snippet(&self, name: &str) -> bool {
        self.snippets.contains_key(name)
    }

    /// Assembled vertex and fragment source for a variant.
    ///
    /// Custom shader variants take their base source from `material`.
    pub fn shader_source(&self, key: &ShaderVariantKey, material: &Material) -> Result<ShaderSource, ShaderError> {
        let (vertex, fragment) = match (key.kind, material.kind()) {
            (ShaderKind::Flat, _) => (sources::FLAT_VERTEX, sources::FLAT_FRAGMENT),
            (ShaderKind::Phong, _) => (sources::PHONG_VERTEX, sources::PHONG_FRAGMENT),
            (ShaderKind::Shader(_), MaterialKind::Shader(shader)) => {
                (shader.vertex_source(), shader.fragment_source())
            }
            (ShaderKind::Shader(_), _) => return Err(ShaderError::NotAShaderMaterial),
        };

        let assembler = ShaderAssembler::new(&self.snippets);
        Ok(ShaderSource {
            vertex: assembler.assemble(vertex, key)?,
            fragment: assembler.assemble(fragment, key)?,
        })
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Color;
    use crate::render::lights::LightCounts;
    use crate::render::material::ShaderMaterial;
    use crate::render::shader::{INCLUDE_DIRECTIVE, INJECTION_MARKER};
    use crate::scene::Scene;

    fn key_for(material: &Material, lights: LightCounts) -> ShaderVariantKey {
        ShaderVariantKey::resolve(material, &lights, &Scene::new())
    }

    #[test]
    fn test_builtin_sources_assemble_cleanly() {
        let library = ShaderLibrary::new();
        let lights = LightCounts { ambient: 1, directional: 1, point: 1, spot: 1 };
        for material in [Material::flat(Color::WHITE), Material::phong(Color::WHITE)] {
            let key = key_for(&material, lights).with_instancing(true);
            let source = library.shader_source(&key, &material).unwrap();
            for stage in [&source.vertex, &source.fragment] {
                assert!(!stage.contains(INJECTION_MARKER));
                assert!(!stage.contains(INCLUDE_DIRECTIVE));
                assert!(stage.starts_with("#version 330 core\n"));
                assert!(stage.contains("#define USE_INSTANCING"));
            }
        }
    }

    #[test]
    fn test_lit_source_carries_light_counts() {
        let library = ShaderLibrary::new();
        let material = Material::phong(Color::WHITE);
        let key = key_for(&material, LightCounts { ambient: 0, directional: 2, point: 0, spot: 1 });
        let source = library.shader_source(&key, &material).unwrap();
        assert!(source.fragment.contains("#define NUM_LIGHTS 3"));
        assert!(source.fragment.contains("uniform ub_Lights"));
    }

    #[test]
    fn test_custom_shader_uses_registered_snippets() {
        let mut library = ShaderLibrary::new();
        library.register_snippet("wave.glsl", "float wave(float t) { return sin(t); }");
        let material = Material::shader(ShaderMaterial::new(
            "#version 330 core\n#pragma inject_attributes\n#include \"wave.glsl\"\nvoid main() {}\n",
            "#version 330 core\n#pragma inject_attributes\nvoid main() {}\n",
        ));
        let key = key_for(&material, LightCounts::default());
        let source = library.shader_source(&key, &material).unwrap();
        assert!(source.vertex.contains("float wave"));
    }

    #[test]
    fn test_custom_shader_without_marker_fails() {
        let library = ShaderLibrary::new();
        let material = Material::shader(ShaderMaterial::new("void main() {}", "void main() {}"));
        let key = key_for(&material, LightCounts::default());
        assert_eq!(library.shader_source(&key, &material), Err(ShaderError::MissingInjectionMarker));

        let flat = Material::flat(Color::WHITE);
        assert_eq!(library.shader_source(&key, &flat), Err(ShaderError::NotAShaderMaterial));
    }
}
