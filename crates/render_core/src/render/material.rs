//! Materials
//!
//! A material is one of a closed set of shading models plus a set of
//! independent render flags. The flags feed both the shader variant key and
//! the render state cache.

use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::foundation::math::Color;

use super::texture::Texture2D;
use super::uniform::UniformValue;

bitflags! {
    /// Independent material switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MaterialFlags: u32 {
        /// Draw triangle edges only
        const WIREFRAME   = 1 << 0;
        /// Disable back-face culling
        const TWO_SIDED   = 1 << 1;
        /// Apply scene fog when the scene has any
        const FOG         = 1 << 2;
        /// Use face normals instead of interpolated normals
        const FLAT_SHADED = 1 << 3;
        /// Draw in the blended pass, sorted back to front
        const TRANSPARENT = 1 << 4;
        /// Test against the depth buffer
        const DEPTH_TEST  = 1 << 5;
        /// Draw at all
        const VISIBLE     = 1 << 6;
    }
}

impl Default for MaterialFlags {
    fn default() -> Self {
        Self::FOG | Self::DEPTH_TEST | Self::VISIBLE
    }
}

/// Blend equation used for transparent materials
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Blending {
    /// Overwrite the destination
    None,
    /// Standard alpha blending
    #[default]
    Normal,
    /// Add source to destination
    Additive,
    /// Subtract source from destination
    Subtractive,
    /// Multiply source and destination
    Multiply,
}

/// Polygon offset applied to push a surface behind or in front of coplanar
/// geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBias {
    /// Slope-scaled factor
    pub factor: f32,
    /// Constant units
    pub units: f32,
}

static NEXT_SHADER_ID: AtomicU32 = AtomicU32::new(1);

fn next_shader_id() -> u32 {
    NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed)
}

/// User supplied shader pair with its own uniforms.
///
/// The program identity follows the sources: clones share it, and replacing
/// either source takes a new one.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderMaterial {
    id: u32,
    vertex_source: String,
    fragment_source: String,
    /// Custom uniform values, set by name every draw
    pub uniforms: Vec<(String, UniformValue)>,
}

impl ShaderMaterial {
    /// Create a shader material; each one gets its own program identity
    pub fn new(vertex_source: impl Into<String>, fragment_source: impl Into<String>) -> Self {
        Self {
            id: next_shader_id(),
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            uniforms: Vec::new(),
        }
    }

    /// Identity used to keep programs of different shader materials apart
    pub const fn shader_id(&self) -> u32 {
        self.id
    }

    /// Vertex stage source, including the attribute injection marker
    pub fn vertex_source(&self) -> &str {
        &self.vertex_source
    }

    /// Fragment stage source, including the attribute injection marker
    pub fn fragment_source(&self) -> &str {
        &self.fragment_source
    }

    /// Replace the vertex stage source
    pub fn set_vertex_source(&mut self, source: impl Into<String>) {
        self.vertex_source = source.into();
        self.id = next_shader_id();
    }

    /// Replace the fragment stage source
    pub fn set_fragment_source(&mut self, source: impl Into<String>) {
        self.fragment_source = source.into();
        self.id = next_shader_id();
    }

    /// Set a custom uniform, replacing any previous value for the name
    pub fn set_uniform(&mut self, name: impl Into<String>, value: UniformValue) {
        let name = name.into();
        match self.uniforms.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.uniforms.push((name, value)),
        }
    }
}

/// Shading model
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialKind {
    /// Unlit, single color
    Flat {
        /// Surface color
        color: Color,
    },
    /// Lit with diffuse and specular terms
    Phong {
        /// Diffuse color
        diffuse: Color,
        /// Specular color
        specular: Color,
        /// Specular exponent
        shininess: f32,
    },
    /// Custom shaders
    Shader(ShaderMaterial),
}

/// Shading model plus render flags
#[derive(Debug, Clone)]
pub struct Material {
    kind: MaterialKind,
    /// Render switches
    pub flags: MaterialFlags,
    /// Blend equation for the transparent pass
    pub blending: Blending,
    /// Optional polygon offset
    pub depth_bias: Option<DepthBias>,
    /// Alpha multiplier
    pub opacity: f32,
    /// Color map
    pub texture: Option<Rc<Texture2D>>,
}

impl Material {
    /// Create a material from a shading model with default flags
    pub fn new(kind: MaterialKind) -> Self {
        Self {
            kind,
            flags: MaterialFlags::default(),
            blending: Blending::default(),
            depth_bias: None,
            opacity: 1.0,
            texture: None,
        }
    }

    /// Unlit single-color material
    pub fn flat(color: Color) -> Self {
        Self::new(MaterialKind::Flat { color })
    }

    /// Lit material with default specular settings
    pub fn phong(diffuse: Color) -> Self {
        Self::new(MaterialKind::Phong {
            diffuse,
            specular: Color::from_hex(0x11_11_11),
            shininess: 32.0,
        })
    }

    /// Custom shader material
    pub fn shader(shader: ShaderMaterial) -> Self {
        Self::new(MaterialKind::Shader(shader))
    }

    /// Shading model
    pub const fn kind(&self) -> &MaterialKind {
        &self.kind
    }

    /// Mutable shading model
    pub fn kind_mut(&mut self) -> &mut MaterialKind {
        &mut self.kind
    }

    /// Whether the material goes to the transparent pass
    pub const fn is_transparent(&self) -> bool {
        self.flags.contains(MaterialFlags::TRANSPARENT)
    }

    /// Whether the material is drawn at all
    pub const fn is_visible(&self) -> bool {
        self.flags.contains(MaterialFlags::VISIBLE)
    }

    /// Whether lights affect this material
    pub const fn is_lit(&self) -> bool {
        matches!(self.kind, MaterialKind::Phong { .. } | MaterialKind::Shader(_))
    }

    /// Texture that can still be bound, if any
    pub fn active_texture(&self) -> Option<&Rc<Texture2D>> {
        self.texture.as_ref().filter(|texture| !texture.is_disposed())
    }

    /// Toggle a flag (builder style)
    #[must_use]
    pub fn with_flag(mut self, flag: MaterialFlags, enabled: bool) -> Self {
        self.flags.set(flag, enabled);
        self
    }

    /// Mark as transparent (builder style)
    #[must_use]
    pub fn with_transparent(self, enabled: bool) -> Self {
        self.with_flag(MaterialFlags::TRANSPARENT, enabled)
    }

    /// Disable back-face culling (builder style)
    #[must_use]
    pub fn with_two_sided(self, enabled: bool) -> Self {
        self.with_flag(MaterialFlags::TWO_SIDED, enabled)
    }

    /// Opt in or out of scene fog (builder style)
    #[must_use]
    pub fn with_fog(self, enabled: bool) -> Self {
        self.with_flag(MaterialFlags::FOG, enabled)
    }

    /// Use face normals (builder style)
    #[must_use]
    pub fn with_flat_shading(self, enabled: bool) -> Self {
        self.with_flag(MaterialFlags::FLAT_SHADED, enabled)
    }

    /// Draw edges only (builder style)
    #[must_use]
    pub fn with_wireframe(self, enabled: bool) -> Self {
        self.with_flag(MaterialFlags::WIREFRAME, enabled)
    }

    /// Set the blend equation (builder style)
    #[must_use]
    pub const fn with_blending(mut self, blending: Blending) -> Self {
        self.blending = blending;
        self
    }

    /// Set a polygon offset (builder style)
    #[must_use]
    pub const fn with_depth_bias(mut self, factor: f32, units: f32) -> Self {
        self.depth_bias = Some(DepthBias { factor, units });
        self
    }

    /// Set the opacity (builder style)
    #[must_use]
    pub const fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    /// Attach a color map (builder style)
    #[must_use]
    pub fn with_texture(mut self, texture: Rc<Texture2D>) -> Self {
        self.texture = Some(texture);
        self
    }
}
