//! # Renderer Configuration
//!
//! Typed settings for the renderer, persisted through the [`Config`] trait
//! as TOML or RON.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Color;
use crate::render::lights::MAX_LIGHTS_CEILING;

pub use crate::config::{Config, ConfigError};

/// # Renderer Configuration
///
/// Viewport, light budget and cache sizing for a [`crate::render::Renderer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Framebuffer width in pixels
    pub width: u32,
    /// Framebuffer height in pixels
    pub height: u32,
    /// Color the framebuffer is cleared to each frame
    pub clear_color: Color,
    /// Hard cap on non-ambient lights folded into the light block
    pub max_lights: usize,
    /// Number of compiled programs kept before least-recently-used eviction
    pub program_cache_capacity: usize,
    /// Sort transparent meshes back to front every frame
    pub sort_transparent: bool,
    /// Fallback `env_logger` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl RendererConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the framebuffer size
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the clear color
    #[must_use]
    pub const fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the light budget
    #[must_use]
    pub const fn with_max_lights(mut self, max_lights: usize) -> Self {
        self.max_lights = max_lights;
        self
    }

    /// Set the program cache capacity
    #[must_use]
    pub const fn with_program_cache_capacity(mut self, capacity: usize) -> Self {
        self.program_cache_capacity = capacity;
        self
    }

    /// Enable or disable per-frame transparent sorting
    #[must_use]
    pub const fn with_sort_transparent(mut self, enabled: bool) -> Self {
        self.sort_transparent = enabled;
        self
    }

    /// Width over height
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Install `env_logger` with this configuration's fallback filter
    pub fn init_logging(&self) {
        crate::foundation::logging::init_with_filter(&self.log_filter);
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!("Viewport must be non-empty, got {}x{}", self.width, self.height));
        }
        if self.max_lights > MAX_LIGHTS_CEILING {
            return Err(format!(
                "max_lights {} exceeds the supported ceiling of {MAX_LIGHTS_CEILING}",
                self.max_lights
            ));
        }
        if self.program_cache_capacity == 0 {
            return Err("program_cache_capacity must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            clear_color: Color::BLACK,
            max_lights: 10,
            program_cache_capacity: 64,
            sort_transparent: true,
            log_filter: "info".to_string(),
        }
    }
}

impl Config for RendererConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFormat;

    #[test]
    fn test_default_is_valid() {
        assert!(RendererConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(RendererConfig::new().with_size(0, 10).validate().is_err());
        assert!(RendererConfig::new().with_max_lights(16).validate().is_err());
        assert!(RendererConfig::new().with_program_cache_capacity(0).validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = RendererConfig::from_str_with("width = 640\nheight = 480\n", ConfigFormat::Toml).unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.max_lights, 10);
        assert!(config.sort_transparent);
    }

    #[test]
    fn test_logging_init_is_idempotent() {
        let config = RendererConfig::new();
        config.init_logging();
        config.init_logging();
        log::debug!("logging initialized twice");
    }

    #[test]
    fn test_save_and_load_ron() {
        let path = std::env::temp_dir().join(format!("render_core_config_{}.ron", std::process::id()));
        let config = RendererConfig::new().with_size(320, 200).with_max_lights(4);
        config.save_to_file(&path).unwrap();
        let loaded = RendererConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }
}
