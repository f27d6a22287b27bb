//! Image loading for textures
//!
//! Decodes PNG files into tightly packed RGBA8 pixels.

use std::path::Path;

use super::{LoadError, ResourceLoader};

/// Decoded image ready for [`Texture2D::from_data`](crate::render::Texture2D::from_data)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// RGBA8 pixels, row-major
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Single-color image, handy as a placeholder while a load is in flight
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Result<Self, LoadError> {
        let pixel_count = (width as usize)
            .checked_mul(height as usize)
            .filter(|count| count.checked_mul(color.len()).is_some())
            .ok_or(LoadError::TooLarge { width, height })?;
        let pixels = color.repeat(pixel_count);
        Ok(Self { width, height, pixels })
    }

    /// Decode an in-memory image
    pub fn from_bytes(bytes: &[u8], flip_y: bool) -> Result<Self, LoadError> {
        let image = image::load_from_memory(bytes).map_err(|e| LoadError::Decode(e.to_string()))?;
        Ok(Self::from_image(image, flip_y))
    }

    fn from_image(image: image::DynamicImage, flip_y: bool) -> Self {
        let image = if flip_y { image.flipv() } else { image };
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self { width, height, pixels: rgba.into_raw() }
    }
}

/// Loads image files as [`TextureData`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TextureLoader {
    /// Flip rows so the first row is the bottom of the image
    pub flip_y: bool,
}

impl TextureLoader {
    /// Loader that keeps rows in file order
    pub const fn new() -> Self {
        Self { flip_y: false }
    }

    /// Loader that flips rows vertically
    pub const fn flipped() -> Self {
        Self { flip_y: true }
    }
}

impl ResourceLoader for TextureLoader {
    type Output = TextureData;

    fn load(&self, path: &Path) -> Result<TextureData, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound(path.to_path_buf()));
        }
        let image = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(io) => LoadError::Io(io),
            other => LoadError::Decode(other.to_string()),
        })?;
        let data = TextureData::from_image(image, self.flip_y);
        log::info!("Loaded image {}x{} from {}", data.width, data.height, path.display());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::mpsc;

    fn write_test_png(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("render_core_assets_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut img = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_load_png() {
        let path = write_test_png("load.png");
        let data = TextureLoader::new().load(&path).unwrap();
        assert_eq!((data.width, data.height), (2, 3));
        assert_eq!(data.pixels.len(), 2 * 3 * 4);
        assert_eq!(&data.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_flip_moves_first_row_to_bottom() {
        let path = write_test_png("flip.png");
        let data = TextureLoader::flipped().load(&path).unwrap();
        let last_row = (data.height as usize - 1) * data.width as usize * 4;
        assert_eq!(&data.pixels[last_row..last_row + 4], &[255, 0, 0, 255]);
        assert_eq!(&data.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let result = TextureLoader::new().load(Path::new("/definitely/not/here.png"));
        assert!(matches!(result, Err(LoadError::NotFound(_))));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let result = TextureData::from_bytes(b"not an image", false);
        assert!(matches!(result, Err(LoadError::Decode(_))));
    }

    #[test]
    fn test_async_load_delivers_through_callback() {
        let path = write_test_png("async.png");
        let (tx, rx) = mpsc::channel();
        let handle = TextureLoader::new().load_async(path, move |result| {
            tx.send(result.map(|d| (d.width, d.height))).unwrap();
        });
        handle.join().unwrap();
        assert_eq!(rx.recv().unwrap().unwrap(), (2, 3));
    }

    #[test]
    fn test_oversized_solid_color_is_rejected() {
        let result = TextureData::solid_color(u32::MAX, u32::MAX, [0; 4]);
        assert!(matches!(result, Err(LoadError::TooLarge { width: u32::MAX, height: u32::MAX })));
    }

    #[test]
    fn test_solid_color() {
        let data = TextureData::solid_color(2, 2, [1, 2, 3, 4]).unwrap();
        assert_eq!(data.pixels, vec![1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4, 1, 2, 3, 4]);
    }
}
