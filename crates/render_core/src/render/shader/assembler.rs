//! Shader source assembly
//!
//! Two text passes run on base source before compilation: the injection
//! marker is replaced by feature defines for the variant, then include
//! directives are substituted from the snippet table until none remain.
//! Both passes are deterministic.

use std::collections::HashMap;
use std::fmt::Write as _;

use super::variant::ShaderVariantKey;
use super::ShaderError;

/// Line replaced by the variant's defines
pub const INJECTION_MARKER: &str = "#pragma inject_attributes";

/// Directive substituted by a snippet, as in `#include "fog.glsl"`
pub const INCLUDE_DIRECTIVE: &str = "#include";

const MAX_INCLUDE_DEPTH: usize = 8;

/// Turns base source into source for one variant
#[derive(Debug, Clone, Copy)]
pub struct ShaderAssembler<'a> {
    snippets: &'a HashMap<String, String>,
}

impl<'a> ShaderAssembler<'a> {
    /// Assembler resolving includes from `snippets`
    pub const fn new(snippets: &'a HashMap<String, String>) -> Self {
        Self { snippets }
    }

    /// Run both passes and reject any marker left behind
    pub fn assemble(&self, source: &str, key: &ShaderVariantKey) -> Result<String, ShaderError> {
        let injected = Self::inject(source, key)?;
        let resolved = self.resolve_includes(&injected)?;
        if let Some(line) = resolved
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with(INJECTION_MARKER) || line.starts_with(INCLUDE_DIRECTIVE))
        {
            return Err(ShaderError::UnresolvedMarker(line.to_string()));
        }
        Ok(resolved)
    }

    /// Replace the first injection marker with the variant's defines
    pub fn inject(source: &str, key: &ShaderVariantKey) -> Result<String, ShaderError> {
        let mut output = String::with_capacity(source.len() + 256);
        let mut injected = false;
        for line in source.lines() {
            if !injected && line.trim() == INJECTION_MARKER {
                output.push_str(&Self::defines(key));
                injected = true;
            } else {
                output.push_str(line);
                output.push('\n');
            }
        }
        if injected {
            Ok(output)
        } else {
            Err(ShaderError::MissingInjectionMarker)
        }
    }

    /// Substitute include directives until none remain.
    /// Source without includes is returned unchanged.
    pub fn resolve_includes(&self, source: &str) -> Result<String, ShaderError> {
        let mut current = source.to_string();
        for _ in 0..MAX_INCLUDE_DEPTH {
            if !current.lines().any(|line| line.trim_start().starts_with(INCLUDE_DIRECTIVE)) {
                return Ok(current);
            }
            let mut output = String::with_capacity(current.len());
            for line in current.lines() {
                match line.trim().strip_prefix(INCLUDE_DIRECTIVE) {
                    Some(rest) => {
                        let name = rest.trim().trim_matches(|c| c == '"' || c == '<' || c == '>');
                        let snippet = self
                            .snippets
                            .get(name)
                            .ok_or_else(|| ShaderError::UnknownInclude(name.to_string()))?;
                        output.push_str(snippet);
                        if !snippet.ends_with('\n') {
                            output.push('\n');
                        }
                    }
                    None => {
                        output.push_str(line);
                        output.push('\n');
                    }
                }
            }
            current = output;
        }
        Err(ShaderError::IncludeDepth(MAX_INCLUDE_DEPTH))
    }

    /// Define block for a variant
    pub fn defines(key: &ShaderVariantKey) -> String {
        let mut defines = String::new();
        let switches = [
            (key.texture_map, "USE_TEXTURE_MAP"),
            (key.flat_shaded, "USE_FLAT_SHADED"),
            (key.two_sided, "USE_TWO_SIDED"),
            (key.fog, "USE_FOG"),
            (key.instancing, "USE_INSTANCING"),
        ];
        for (_, name) in switches.iter().filter(|(enabled, _)| *enabled) {
            let _ = writeln!(defines, "#define {name}");
        }
        let _ = writeln!(defines, "#define NUM_DIR_LIGHTS {}", key.directional_lights);
        let _ = writeln!(defines, "#define NUM_POINT_LIGHTS {}", key.point_lights);
        let _ = writeln!(defines, "#define NUM_SPOT_LIGHTS {}", key.spot_lights);
        let _ = writeln!(defines, "#define NUM_LIGHTS {}", key.light_count());
        defines
    }
}
