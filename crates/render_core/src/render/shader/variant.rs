//! Shader variant keys

use crate::render::lights::{LightCounts, MAX_LIGHTS_CEILING};
use crate::render::material::{Material, MaterialFlags, MaterialKind};
use crate::scene::Scene;

/// Shading model part of a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// Unlit
    Flat,
    /// Lit with specular
    Phong,
    /// Custom shader material, by shader id
    Shader(u32),
}

impl ShaderKind {
    const fn tag(self) -> u64 {
        match self {
            Self::Flat => 0,
            Self::Phong => 1,
            Self::Shader(_) => 2,
        }
    }
}

/// Everything that selects one compiled program.
///
/// Derived fresh for every draw; two keys with equal hashes render
/// identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderVariantKey {
    /// Shading model
    pub kind: ShaderKind,
    /// A live color map is bound
    pub texture_map: bool,
    /// Face normals
    pub flat_shaded: bool,
    /// Back faces lit as front faces
    pub two_sided: bool,
    /// Material wants fog and the scene has some
    pub fog: bool,
    /// Per-instance transforms and colors
    pub instancing: bool,
    /// Active directional lights
    pub directional_lights: u8,
    /// Active point lights
    pub point_lights: u8,
    /// Active spot lights
    pub spot_lights: u8,
}

impl ShaderVariantKey {
    /// Derive the key for drawing `material` in `scene` with this frame's lights
    pub fn resolve(material: &Material, lights: &LightCounts, scene: &Scene) -> Self {
        let kind = match material.kind() {
            MaterialKind::Flat { .. } => ShaderKind::Flat,
            MaterialKind::Phong { .. } => ShaderKind::Phong,
            MaterialKind::Shader(shader) => ShaderKind::Shader(shader.shader_id()),
        };
        let count = |n: usize| if material.is_lit() { u8::try_from(n.min(MAX_LIGHTS_CEILING)).unwrap_or(0) } else { 0 };

        Self {
            kind,
            texture_map: material.active_texture().is_some(),
            flat_shaded: material.flags.contains(MaterialFlags::FLAT_SHADED),
            two_sided: material.flags.contains(MaterialFlags::TWO_SIDED),
            fog: material.flags.contains(MaterialFlags::FOG) && scene.fog().is_some(),
            instancing: false,
            directional_lights: count(lights.directional),
            point_lights: count(lights.point),
            spot_lights: count(lights.spot),
        }
    }

    /// Same key with the instancing bit set (builder style)
    #[must_use]
    pub const fn with_instancing(mut self, instancing: bool) -> Self {
        self.instancing = instancing;
        self
    }

    /// Total light slots used by the variant
    pub const fn light_count(&self) -> usize {
        self.directional_lights as usize + self.point_lights as usize + self.spot_lights as usize
    }

    /// Canonical hash.
    ///
    /// Fields are packed into fixed bit ranges, so distinct keys never
    /// collide as long as each light count stays within four bits:
    ///
    /// | bits   | field              |
    /// |--------|--------------------|
    /// | 0-3    | kind tag           |
    /// | 4-8    | feature switches   |
    /// | 9-20   | light counts       |
    /// | 32-63  | custom shader id   |
    ///
    /// Each light count must be at most [`MAX_LIGHTS_CEILING`] to fit its
    /// 4-bit field. Debug builds panic on a key that breaks this.
    pub const fn hash(&self) -> u64 {
        debug_assert!(
            self.directional_lights as usize <= MAX_LIGHTS_CEILING
                && self.point_lights as usize <= MAX_LIGHTS_CEILING
                && self.spot_lights as usize <= MAX_LIGHTS_CEILING,
            "light count exceeds the variant key ceiling"
        );
        let shader_id = match self.kind {
            ShaderKind::Shader(id) => id as u64,
            ShaderKind::Flat | ShaderKind::Phong => 0,
        };
        self.kind.tag()
            | (self.texture_map as u64) << 4
            | (self.flat_shaded as u64) << 5
            | (self.two_sided as u64) << 6
            | (self.fog as u64) << 7
            | (self.instancing as u64) << 8
            | ((self.directional_lights & 0xF) as u64) << 9
            | ((self.point_lights & 0xF) as u64) << 13
            | ((self.spot_lights & 0xF) as u64) << 17
            | shader_id << 32
    }
}
