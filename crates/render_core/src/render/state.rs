//! Render state cache
//!
//! Mirrors the backend's global state so redundant toggles never reach it.
//! Unknown state (fresh cache or after [`StateCache::reset`]) is always
//! written through.

use std::collections::HashMap;

use crate::foundation::math::Color;

use super::backend::{Capability, GraphicsBackend, PolygonMode, ProgramHandle};
use super::material::{Blending, Material, MaterialFlags};

/// Last known backend state
#[derive(Debug, Default)]
pub struct StateCache {
    capabilities: HashMap<Capability, bool>,
    depth_mask: Option<bool>,
    blending: Option<Blending>,
    polygon_mode: Option<PolygonMode>,
    polygon_offset: Option<(f32, f32)>,
    clear_color: Option<Color>,
    viewport: Option<(i32, i32, u32, u32)>,
    program: Option<ProgramHandle>,
}

impl StateCache {
    /// Cache with every state unknown
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything, e.g. after foreign code touched the backend
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Enable or disable a capability. Returns whether the backend was called.
    pub fn set_capability<B: GraphicsBackend + ?Sized>(&mut self, capability: Capability, enabled: bool, backend: &mut B) -> bool {
        if self.capabilities.get(&capability) == Some(&enabled) {
            return false;
        }
        if enabled {
            backend.enable(capability);
        } else {
            backend.disable(capability);
        }
        self.capabilities.insert(capability, enabled);
        true
    }

    /// Whether a capability is known to be enabled
    pub fn is_enabled(&self, capability: Capability) -> bool {
        self.capabilities.get(&capability).copied().unwrap_or(false)
    }

    /// Enable or disable depth writes
    pub fn set_depth_mask<B: GraphicsBackend + ?Sized>(&mut self, enabled: bool, backend: &mut B) -> bool {
        if self.depth_mask == Some(enabled) {
            return false;
        }
        backend.set_depth_mask(enabled);
        self.depth_mask = Some(enabled);
        true
    }

    /// Set the blend equation
    pub fn set_blending<B: GraphicsBackend + ?Sized>(&mut self, blending: Blending, backend: &mut B) -> bool {
        if self.blending == Some(blending) {
            return false;
        }
        backend.set_blend_mode(blending);
        self.blending = Some(blending);
        true
    }

    /// Set fill or line rasterization
    pub fn set_polygon_mode<B: GraphicsBackend + ?Sized>(&mut self, mode: PolygonMode, backend: &mut B) -> bool {
        if self.polygon_mode == Some(mode) {
            return false;
        }
        backend.set_polygon_mode(mode);
        self.polygon_mode = Some(mode);
        true
    }

    /// Set the polygon offset
    pub fn set_polygon_offset<B: GraphicsBackend + ?Sized>(&mut self, factor: f32, units: f32, backend: &mut B) -> bool {
        if self.polygon_offset == Some((factor, units)) {
            return false;
        }
        backend.set_polygon_offset(factor, units);
        self.polygon_offset = Some((factor, units));
        true
    }

    /// Set the clear color
    pub fn set_clear_color<B: GraphicsBackend + ?Sized>(&mut self, color: Color, backend: &mut B) -> bool {
        if self.clear_color == Some(color) {
            return false;
        }
        backend.set_clear_color(color);
        self.clear_color = Some(color);
        true
    }

    /// Set the viewport rectangle
    pub fn set_viewport<B: GraphicsBackend + ?Sized>(&mut self, x: i32, y: i32, width: u32, height: u32, backend: &mut B) -> bool {
        if self.viewport == Some((x, y, width, height)) {
            return false;
        }
        backend.set_viewport(x, y, width, height);
        self.viewport = Some((x, y, width, height));
        true
    }

    /// Make a program current
    pub fn use_program<B: GraphicsBackend + ?Sized>(&mut self, program: ProgramHandle, backend: &mut B) -> bool {
        if self.program == Some(program) {
            return false;
        }
        backend.use_program(program);
        self.program = Some(program);
        true
    }

    /// Current program, if known
    pub const fn program(&self) -> Option<ProgramHandle> {
        self.program
    }

    /// Forget a deleted program so a new one with the same handle is rebound
    pub fn invalidate_program(&mut self, program: ProgramHandle) {
        if self.program == Some(program) {
            self.program = None;
        }
    }

    /// Apply the fixed-function state a material needs
    pub fn apply_material<B: GraphicsBackend + ?Sized>(&mut self, material: &Material, backend: &mut B) {
        self.set_capability(Capability::CullFace, !material.flags.contains(MaterialFlags::TWO_SIDED), backend);
        self.set_capability(Capability::DepthTest, material.flags.contains(MaterialFlags::DEPTH_TEST), backend);

        match material.depth_bias {
            Some(bias) => {
                self.set_capability(Capability::PolygonOffsetFill, true, backend);
                self.set_polygon_offset(bias.factor, bias.units, backend);
            }
            None => {
                self.set_capability(Capability::PolygonOffsetFill, false, backend);
            }
        }

        if material.is_transparent() && material.blending != Blending::None {
            self.set_capability(Capability::Blend, true, backend);
            self.set_blending(material.blending, backend);
        } else {
            self.set_capability(Capability::Blend, false, backend);
        }

        let mode = if material.flags.contains(MaterialFlags::WIREFRAME) { PolygonMode::Line } else { PolygonMode::Fill };
        self.set_polygon_mode(mode, backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::{BackendCall, HeadlessBackend};

    #[test]
    fn test_redundant_state_is_filtered() {
        let mut backend = HeadlessBackend::new();
        let mut state = StateCache::new();

        assert!(state.set_capability(Capability::DepthTest, true, &mut backend));
        assert!(!state.set_capability(Capability::DepthTest, true, &mut backend));
        assert!(state.set_depth_mask(false, &mut backend));
        assert!(!state.set_depth_mask(false, &mut backend));
        assert!(state.use_program(ProgramHandle(1), &mut backend));
        assert!(!state.use_program(ProgramHandle(1), &mut backend));
        assert_eq!(backend.calls().len(), 3);

        state.reset();
        assert!(state.set_depth_mask(false, &mut backend));
    }

    #[test]
    fn test_invalidated_program_is_rebound() {
        let mut backend = HeadlessBackend::new();
        let mut state = StateCache::new();
        state.use_program(ProgramHandle(7), &mut backend);
        state.invalidate_program(ProgramHandle(3));
        assert_eq!(state.program(), Some(ProgramHandle(7)));
        state.invalidate_program(ProgramHandle(7));
        assert!(state.use_program(ProgramHandle(7), &mut backend));
    }

    #[test]
    fn test_material_state_mapping() {
        let mut backend = HeadlessBackend::new();
        let mut state = StateCache::new();
        let material = Material::flat(Color::WHITE)
            .with_two_sided(true)
            .with_transparent(true)
            .with_wireframe(true)
            .with_blending(Blending::Additive)
            .with_depth_bias(1.0, 2.0);

        state.apply_material(&material, &mut backend);
        assert!(!state.is_enabled(Capability::CullFace));
        assert!(state.is_enabled(Capability::Blend));
        assert!(state.is_enabled(Capability::PolygonOffsetFill));
        assert!(backend.calls().contains(&BackendCall::BlendMode(Blending::Additive)));
        assert!(backend.calls().contains(&BackendCall::PolygonOffset(1.0, 2.0)));
        assert!(backend.calls().contains(&BackendCall::PolygonMode(PolygonMode::Line)));

        backend.clear_calls();
        state.apply_material(&material, &mut backend);
        assert!(backend.calls().is_empty());

        state.apply_material(&Material::flat(Color::WHITE), &mut backend);
        assert!(state.is_enabled(Capability::CullFace));
        assert!(!state.is_enabled(Capability::Blend));
        assert!(backend.calls().contains(&BackendCall::PolygonMode(PolygonMode::Fill)));
    }
}
