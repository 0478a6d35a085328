//! Bridge server startup helper for embedding in the bridge binary.
//!
//! Provides [`spawn_api`] which launches the HTTP + `WebSocket` server
//! on a background Tokio task. The bridge binary calls this during
//! startup so the API runs concurrently with the device simulator.
//!
//! # Usage
//!
//! ```rust,ignore
//! use teststand_api::startup::spawn_api;
//! use teststand_api::state::AppState;
//! use std::sync::Arc;
//!
//! let state = Arc::new(AppState::new());
//! let handle = spawn_api(5000, state).await?;
//! // The server is now running. The handle can be awaited on shutdown.
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the bridge server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Spawn the bridge HTTP server on a background Tokio task.
///
/// Binds to `0.0.0.0:{port}` and serves the REST API plus `WebSocket`
/// endpoint for the event stream. Returns a [`JoinHandle`] so the
/// caller can manage the server's lifecycle alongside the simulator.
///
/// The server runs until the Tokio runtime is shut down or the task
/// is aborted. The caller should hold the returned handle and abort
/// or await it during clean shutdown.
///
/// # Arguments
///
/// * `port` -- TCP port to listen on (typically 5000).
/// * `state` -- Shared application state containing the coordinator,
///   broadcast channel, and latest-reading slot.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the configured address cannot
/// be parsed. Bind failures surface asynchronously from the spawned
/// task.
pub async fn spawn_api(port: u16, state: Arc<AppState>) -> Result<JoinHandle<()>, StartupError> {
    let config = ServerConfig {
        host: String::from("0.0.0.0"),
        port,
    };

    // Verify the address is parseable before spawning the background task.
    // The actual bind happens inside start_server, but we catch obvious
    // misconfigurations early.
    let addr_str = format!("{}:{}", config.host, config.port);
    let _: std::net::SocketAddr = addr_str.parse().map_err(|e| {
        StartupError::Server(ServerError::Bind(format!("invalid address {addr_str}: {e}")))
    })?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state).await {
            tracing::error!(error = %e, "Bridge server exited with error");
        }
    });

    tracing::info!(port, "Bridge server spawned on background task");

    Ok(handle)
}
