//! Logging setup
//!
//! The crate logs through the `log` facade. These helpers install
//! `env_logger` as the backend for applications and tests that want output.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system, honoring `RUST_LOG`.
///
/// Calling this more than once is harmless.
pub fn init() {
    init_with_filter("info");
}

/// Initialize logging with a fallback filter used when `RUST_LOG` is unset.
pub fn init_with_filter(filter: &str) {
    let env = env_logger::Env::default().default_filter_or(filter);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized, keeping existing configuration");
    }
}
