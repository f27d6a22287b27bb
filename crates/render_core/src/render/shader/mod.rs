//! Shader permutations
//!
//! ```text
//! Material + LightCounts + Scene fog
//!      ↓ ShaderVariantKey::resolve
//! ShaderVariantKey ──hash──▶ ProgramCache key
//!      ↓ ShaderLibrary::shader_source
//! base source ─▶ inject defines ─▶ resolve includes ─▶ ShaderSource
//! ```

mod assembler;
mod library;
mod sources;
mod variant;

pub use assembler::{ShaderAssembler, INCLUDE_DIRECTIVE, INJECTION_MARKER};
pub use library::ShaderLibrary;
pub use variant::{ShaderKind, ShaderVariantKey};

/// Errors raised while assembling shader source
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// Base source has no injection marker
    #[error("Shader source has no attribute injection marker")]
    MissingInjectionMarker,

    /// A marker survived assembly
    #[error("Unresolved marker left in shader source: {0}")]
    UnresolvedMarker(String),

    /// Include names a fragment that is not in the table
    #[error("Unknown shader include '{0}'")]
    UnknownInclude(String),

    /// Includes nest deeper than allowed, most likely a cycle
    #[error("Shader includes nest deeper than {0} levels")]
    IncludeDepth(usize),

    /// Key describes a custom shader but the material has none
    #[error("Variant requires a shader material")]
    NotAShaderMaterial,
}

/// Vertex and fragment source for one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Vertex stage
    pub vertex: String,
    /// Fragment stage
    pub fragment: String,
}
