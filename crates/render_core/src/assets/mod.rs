//! Asset loading
//!
//! Loaders turn files into CPU-side data that resources are created from.
//! Decoding can run on a worker thread; the result is handed back through a
//! callback so the graphics thread only ever creates the resource.

pub mod image_loader;

pub use image_loader::{TextureData, TextureLoader};

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use thiserror::Error;

/// Asset loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The path does not exist
    #[error("Asset not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Image dimensions whose pixel buffer does not fit in memory
    #[error("Image of {width}x{height} pixels is too large")]
    TooLarge {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// The file exists but could not be decoded
    #[error("Failed to decode asset: {0}")]
    Decode(String),
}

/// Something that turns a file into loaded data
pub trait ResourceLoader {
    /// Loaded data
    type Output;

    /// Load synchronously
    fn load(&self, path: &Path) -> Result<Self::Output, LoadError>;

    /// Load on a worker thread and hand the result to `callback` there
    fn load_async<F>(&self, path: PathBuf, callback: F) -> JoinHandle<()>
    where
        Self: Clone + Send + 'static,
        Self::Output: Send + 'static,
        F: FnOnce(Result<Self::Output, LoadError>) + Send + 'static,
    {
        let loader = self.clone();
        thread::spawn(move || {
            log::debug!("Loading {} in background", path.display());
            callback(loader.load(&path));
        })
    }
}
