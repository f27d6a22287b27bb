//! 2D textures

use crate::assets::TextureData;
use crate::foundation::math::{Mat3, Vec2};

use super::resource::{Disposal, ResourceId};

/// RGBA8 texture with a UV transform
#[derive(Debug)]
pub struct Texture2D {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    /// UV offset
    pub offset: Vec2,
    /// UV repeat
    pub repeat: Vec2,
    /// UV rotation in radians
    pub rotation: f32,
    disposal: Disposal,
}

impl Texture2D {
    /// Create a texture from tightly packed RGBA8 pixels
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
            offset: Vec2::zeros(),
            repeat: Vec2::repeat(1.0),
            rotation: 0.0,
            disposal: Disposal::new(ResourceId::next()),
        }
    }

    /// Create a texture from decoded loader output
    pub fn from_data(data: TextureData) -> Self {
        Self::new(data.width, data.height, data.pixels)
    }

    /// Resource identity
    pub const fn id(&self) -> ResourceId {
        self.disposal.id()
    }

    /// Width in pixels
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// UV transform: translate, then rotate, then scale
    pub fn transform(&self) -> Mat3 {
        let (s, c) = self.rotation.sin_cos();
        Mat3::new(
            self.repeat.x * c, self.repeat.x * s, self.offset.x,
            -self.repeat.y * s, self.repeat.y * c, self.offset.y,
            0.0, 0.0, 1.0,
        )
    }

    /// Whether the texture was disposed
    pub fn is_disposed(&self) -> bool {
        self.disposal.is_disposed()
    }

    /// Release GPU resources held for this texture. Idempotent.
    pub fn dispose(&self) {
        self.disposal.dispose();
    }

    /// Disposal signal, for caches registering eviction callbacks
    pub const fn disposal(&self) -> &Disposal {
        &self.disposal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_transform_is_identity() {
        let texture = Texture2D::new(1, 1, vec![255; 4]);
        assert_eq!(texture.transform(), Mat3::identity());
    }

    #[test]
    fn test_offset_and_repeat() {
        let mut texture = Texture2D::new(1, 1, vec![255; 4]);
        texture.offset = Vec2::new(0.5, 0.25);
        texture.repeat = Vec2::new(2.0, 3.0);
        let m = texture.transform();
        assert_eq!(m[(0, 0)], 2.0);
        assert_eq!(m[(1, 1)], 3.0);
        assert_eq!(m[(0, 2)], 0.5);
        assert_eq!(m[(1, 2)], 0.25);
    }
}
