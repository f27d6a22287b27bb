//! # Core Module
//!
//! Shared configuration used by the renderer and its applications.

pub mod config;

pub use config::{Config, ConfigError, RendererConfig};
