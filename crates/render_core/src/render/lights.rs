//! Per-frame light aggregation
//!
//! Folds the scene's lights into one accumulated ambient color plus a
//! fixed-capacity array of camera-space lights, packed for a std140 uniform
//! block. Slots are ordered directional, point, spot so shaders can loop
//! each kind by its count.

use crate::foundation::math::{Color, Mat4, Vec3, Vec4};

use super::backend::GraphicsBackend;
use super::light::{Attenuation, Light, LightKind};

/// Upper bound for the configurable light cap. Each per-kind count must fit
/// in four bits of the shader variant hash.
pub const MAX_LIGHTS_CEILING: usize = 15;

/// Name of the uniform block holding packed lights
pub const LIGHT_BLOCK: &str = "ub_Lights";

/// 32-bit words per packed light (five `vec4`s)
pub const LIGHT_WORDS: usize = 20;

/// Type tag stored in a packed light
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum LightType {
    /// Parallel rays
    Directional = 0,
    /// Omnidirectional
    Point = 1,
    /// Cone
    Spot = 2,
}

/// Number of active lights per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LightCounts {
    /// 0 or 1
    pub ambient: usize,
    /// Directional lights
    pub directional: usize,
    /// Point lights
    pub point: usize,
    /// Spot lights
    pub spot: usize,
}

impl LightCounts {
    /// Lights occupying array slots (ambient excluded)
    pub const fn total(&self) -> usize {
        self.directional + self.point + self.spot
    }
}

/// One camera-space light slot.
///
/// Layout as five `vec4`s: `kind`, `color`, `position`,
/// `direction + cos(angle)`, `cos(angle * (1 - penumbra)) + attenuation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformLight {
    /// Type tag
    pub kind: LightType,
    /// Color scaled by intensity
    pub color: Vec3,
    /// Camera-space position, zero for directional lights
    pub position: Vec3,
    /// Camera-space unit vector pointing towards the light
    pub direction: Vec3,
    /// Cosine of the spot cone half angle
    pub cone_cos: f32,
    /// Cosine where the penumbra fade starts
    pub penumbra_cos: f32,
    /// Distance falloff
    pub attenuation: Attenuation,
}

impl UniformLight {
    fn pack(&self, words: &mut Vec<u32>) {
        let vec3 = |v: &Vec3| [v.x.to_bits(), v.y.to_bits(), v.z.to_bits()];
        words.extend_from_slice(&[self.kind as u32, 0, 0, 0]);
        words.extend_from_slice(&vec3(&self.color));
        words.push(0);
        words.extend_from_slice(&vec3(&self.position));
        words.push(0);
        words.extend_from_slice(&vec3(&self.direction));
        words.push(self.cone_cos.to_bits());
        words.extend_from_slice(&[
            self.penumbra_cos.to_bits(),
            self.attenuation.base.to_bits(),
            self.attenuation.linear.to_bits(),
            self.attenuation.quadratic.to_bits(),
        ]);
    }
}

/// Collects lights for one frame and uploads the packed block when it changes
#[derive(Debug)]
pub struct LightAggregator {
    max_lights: usize,
    ambient: Color,
    ambient_count: usize,
    directional: Vec<UniformLight>,
    point: Vec<UniformLight>,
    spot: Vec<UniformLight>,
    uploaded: Option<Vec<u32>>,
}

impl LightAggregator {
    /// Create an aggregator holding at most `max_lights` non-ambient lights
    pub fn new(max_lights: usize) -> Self {
        let max_lights = max_lights.min(MAX_LIGHTS_CEILING);
        Self {
            max_lights,
            ambient: Color::BLACK,
            ambient_count: 0,
            directional: Vec::new(),
            point: Vec::new(),
            spot: Vec::new(),
            uploaded: None,
        }
    }

    /// Capacity of the light array
    pub const fn max_lights(&self) -> usize {
        self.max_lights
    }

    /// Forget this frame's lights. The last uploaded block is kept for diffing.
    pub fn reset(&mut self) {
        self.ambient = Color::BLACK;
        self.ambient_count = 0;
        self.directional.clear();
        self.point.clear();
        self.spot.clear();
    }

    /// Fold one light into the frame.
    ///
    /// `world` is the light node's world transform, `view` the camera's
    /// view matrix. Returns whether the light was accepted.
    pub fn add_light(&mut self, light: &Light, world: &Mat4, view: &Mat4) -> bool {
        let color = light.radiance().to_vec3();

        if matches!(light.kind, LightKind::Ambient) {
            if self.ambient_count > 0 {
                log::error!("Scene has more than one ambient light, ignoring the extra one");
                return false;
            }
            self.ambient_count = 1;
            self.ambient = self.ambient + light.radiance();
            return true;
        }

        let index = self.counts().total();
        if index >= self.max_lights {
            log::error!("Light limit of {} reached, dropping {:?} light", self.max_lights, light.kind);
            return false;
        }

        let world_position = Vec3::new(world[(0, 3)], world[(1, 3)], world[(2, 3)]);
        let view_position = (view * Vec4::new(world_position.x, world_position.y, world_position.z, 1.0)).xyz();
        let view_direction = |target: &Vec3| {
            let towards_light = (world_position - target).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z);
            let direction = view * Vec4::new(towards_light.x, towards_light.y, towards_light.z, 0.0);
            direction.xyz().try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z)
        };

        match light.kind {
            LightKind::Ambient => {}
            LightKind::Directional { target } => self.directional.push(UniformLight {
                kind: LightType::Directional,
                color,
                position: Vec3::zeros(),
                direction: view_direction(&target),
                cone_cos: 0.0,
                penumbra_cos: 0.0,
                attenuation: Attenuation::default(),
            }),
            LightKind::Point { attenuation } => self.point.push(UniformLight {
                kind: LightType::Point,
                color,
                position: view_position,
                direction: Vec3::zeros(),
                cone_cos: 0.0,
                penumbra_cos: 0.0,
                attenuation,
            }),
            LightKind::Spot { target, angle, penumbra, attenuation } => self.spot.push(UniformLight {
                kind: LightType::Spot,
                color,
                position: view_position,
                direction: view_direction(&target),
                cone_cos: angle.cos(),
                penumbra_cos: (angle * (1.0 - penumbra)).cos(),
                attenuation,
            }),
        }
        true
    }

    /// Accumulated ambient color
    pub const fn ambient(&self) -> Color {
        self.ambient
    }

    /// Active light counts
    pub fn counts(&self) -> LightCounts {
        LightCounts {
            ambient: self.ambient_count,
            directional: self.directional.len(),
            point: self.point.len(),
            spot: self.spot.len(),
        }
    }

    /// Slots in upload order
    pub fn lights(&self) -> impl Iterator<Item = &UniformLight> {
        self.directional.iter().chain(&self.point).chain(&self.spot)
    }

    /// Packed block: a header of per-kind counts followed by every slot
    pub fn block_data(&self) -> Vec<u32> {
        let counts = self.counts();
        let mut words = Vec::with_capacity(4 + counts.total() * LIGHT_WORDS);
        for count in [counts.directional, counts.point, counts.spot, counts.total()] {
            words.push(u32::try_from(count).unwrap_or(u32::MAX));
        }
        for light in self.lights() {
            light.pack(&mut words);
        }
        words
    }

    /// Upload the block if it differs from the last upload.
    /// Returns whether an upload happened.
    pub fn upload_if_needed<B: GraphicsBackend + ?Sized>(&mut self, backend: &mut B) -> bool {
        let words = self.block_data();
        if self.uploaded.as_ref() == Some(&words) {
            return false;
        }
        backend.upload_uniform_block(LIGHT_BLOCK, bytemuck::cast_slice(&words));
        log::trace!("Uploaded {} lights", self.counts().total());
        self.uploaded = Some(words);
        true
    }

    /// Force the next [`LightAggregator::upload_if_needed`] to upload
    pub fn invalidate(&mut self) {
        self.uploaded = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::HeadlessBackend;
    use approx::assert_relative_eq;

    fn at(x: f32, y: f32, z: f32) -> Mat4 {
        Mat4::new_translation(&Vec3::new(x, y, z))
    }

    #[test]
    fn test_white_directional_light_packing() {
        let mut lights = LightAggregator::new(4);
        let light = Light::directional(Color::from_hex(0xFF_FF_FF), 1.0);
        assert!(lights.add_light(&light, &at(0.0, 10.0, 0.0), &Mat4::identity()));

        let slot = lights.lights().next().unwrap();
        assert_relative_eq!(slot.color, Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(slot.position, Vec3::zeros());
        assert_relative_eq!(slot.direction, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(lights.counts().directional, 1);
    }

    #[test]
    fn test_positions_are_in_camera_space() {
        let mut lights = LightAggregator::new(4);
        let view = at(0.0, 0.0, -5.0);
        lights.add_light(&Light::point(Color::WHITE, 2.0), &at(1.0, 2.0, 3.0), &view);

        let slot = lights.lights().next().unwrap();
        assert_relative_eq!(slot.position, Vec3::new(1.0, 2.0, -2.0));
        assert_relative_eq!(slot.color, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_second_ambient_is_rejected() {
        let mut lights = LightAggregator::new(4);
        assert!(lights.add_light(&Light::ambient(Color::new(0.2, 0.2, 0.2), 1.0), &Mat4::identity(), &Mat4::identity()));
        assert!(!lights.add_light(&Light::ambient(Color::WHITE, 1.0), &Mat4::identity(), &Mat4::identity()));
        assert_relative_eq!(lights.ambient().r, 0.2);
        assert_eq!(lights.counts().ambient, 1);
    }

    #[test]
    fn test_lights_over_the_cap_are_dropped() {
        let mut lights = LightAggregator::new(2);
        for _ in 0..3 {
            lights.add_light(&Light::point(Color::WHITE, 1.0), &Mat4::identity(), &Mat4::identity());
        }
        assert_eq!(lights.counts().total(), 2);
        assert!(lights.add_light(&Light::ambient(Color::WHITE, 1.0), &Mat4::identity(), &Mat4::identity()));
    }

    #[test]
    fn test_spot_cone_cosines() {
        let mut lights = LightAggregator::new(4);
        let spot = Light::spot(Color::WHITE, 1.0, std::f32::consts::FRAC_PI_3, 0.5);
        lights.add_light(&spot, &at(0.0, 4.0, 0.0), &Mat4::identity());

        let slot = lights.lights().next().unwrap();
        assert_relative_eq!(slot.cone_cos, 0.5, epsilon = 1e-6);
        assert_relative_eq!(slot.penumbra_cos, (std::f32::consts::FRAC_PI_6).cos(), epsilon = 1e-6);
    }

    #[test]
    fn test_slots_are_grouped_by_kind() {
        let mut lights = LightAggregator::new(4);
        lights.add_light(&Light::point(Color::WHITE, 1.0), &Mat4::identity(), &Mat4::identity());
        lights.add_light(&Light::directional(Color::WHITE, 1.0), &at(0.0, 1.0, 0.0), &Mat4::identity());

        let kinds: Vec<LightType> = lights.lights().map(|l| l.kind).collect();
        assert_eq!(kinds, vec![LightType::Directional, LightType::Point]);
        assert_eq!(lights.block_data().len(), 4 + 2 * LIGHT_WORDS);
    }

    #[test]
    fn test_unchanged_block_is_not_uploaded_again() {
        let mut backend = HeadlessBackend::new();
        let mut lights = LightAggregator::new(4);
        let light = Light::point(Color::WHITE, 1.0);

        lights.add_light(&light, &Mat4::identity(), &Mat4::identity());
        assert!(lights.upload_if_needed(&mut backend));

        lights.reset();
        lights.add_light(&light, &Mat4::identity(), &Mat4::identity());
        assert!(!lights.upload_if_needed(&mut backend));

        lights.reset();
        lights.add_light(&light, &at(1.0, 0.0, 0.0), &Mat4::identity());
        assert!(lights.upload_if_needed(&mut backend));
        assert_eq!(backend.uniform_block(LIGHT_BLOCK).map(<[u8]>::len), Some((4 + LIGHT_WORDS) * 4));
    }
}
