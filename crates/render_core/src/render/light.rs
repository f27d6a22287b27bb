//! Light sources

use crate::foundation::math::{Color, Vec3};

/// Distance falloff `1 / (base + linear * d + quadratic * d^2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    /// Constant term
    pub base: f32,
    /// Linear term
    pub linear: f32,
    /// Quadratic term
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self { base: 1.0, linear: 0.0, quadratic: 0.0 }
    }
}

/// Light geometry by type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    /// Uniform light from every direction
    Ambient,
    /// Parallel rays travelling from the light's position towards `target`
    Directional {
        /// World-space point the light aims at
        target: Vec3,
    },
    /// Omnidirectional light at the node position
    Point {
        /// Distance falloff
        attenuation: Attenuation,
    },
    /// Cone of light from the node position towards `target`
    Spot {
        /// World-space point the light aims at
        target: Vec3,
        /// Cone half angle in radians
        angle: f32,
        /// Fraction of the cone that fades out, in `[0, 1]`
        penumbra: f32,
        /// Distance falloff
        attenuation: Attenuation,
    },
}

/// Light source attached to a scene node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Light color
    pub color: Color,
    /// Color multiplier
    pub intensity: f32,
    /// Type-specific geometry
    pub kind: LightKind,
}

impl Light {
    /// Ambient light
    pub const fn ambient(color: Color, intensity: f32) -> Self {
        Self { color, intensity, kind: LightKind::Ambient }
    }

    /// Directional light aiming at the world origin
    pub fn directional(color: Color, intensity: f32) -> Self {
        Self { color, intensity, kind: LightKind::Directional { target: Vec3::zeros() } }
    }

    /// Point light without falloff
    pub fn point(color: Color, intensity: f32) -> Self {
        Self { color, intensity, kind: LightKind::Point { attenuation: Attenuation::default() } }
    }

    /// Spot light aiming at the world origin
    pub fn spot(color: Color, intensity: f32, angle: f32, penumbra: f32) -> Self {
        Self {
            color,
            intensity,
            kind: LightKind::Spot {
                target: Vec3::zeros(),
                angle,
                penumbra: penumbra.clamp(0.0, 1.0),
                attenuation: Attenuation::default(),
            },
        }
    }

    /// Aim a directional or spot light (builder style)
    #[must_use]
    pub fn with_target(mut self, new_target: Vec3) -> Self {
        match &mut self.kind {
            LightKind::Directional { target } | LightKind::Spot { target, .. } => *target = new_target,
            LightKind::Ambient | LightKind::Point { .. } => {
                log::warn!("Ignoring target on a light without direction");
            }
        }
        self
    }

    /// Set falloff on a point or spot light (builder style)
    #[must_use]
    pub fn with_attenuation(mut self, value: Attenuation) -> Self {
        match &mut self.kind {
            LightKind::Point { attenuation } | LightKind::Spot { attenuation, .. } => *attenuation = value,
            LightKind::Ambient | LightKind::Directional { .. } => {
                log::warn!("Ignoring attenuation on a light without falloff");
            }
        }
        self
    }

    /// Color scaled by intensity
    pub fn radiance(&self) -> Color {
        self.color.scaled(self.intensity)
    }
}
