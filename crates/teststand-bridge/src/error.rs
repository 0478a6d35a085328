//! Error types for the bridge binary.
//!
//! [`BridgeError`] is the top-level error type that wraps all possible
//! failure modes during bridge startup.

/// Top-level error for the bridge binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: teststand_core::config::ConfigError,
    },

    /// The gateway server failed to start.
    #[error("startup error: {source}")]
    Startup {
        /// The underlying startup error.
        #[from]
        source: teststand_api::startup::StartupError,
    },
}
