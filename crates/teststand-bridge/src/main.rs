//! Bridge binary for the teststand battery test relay.
//!
//! This is the main entry point that wires together the gateway server
//! and the simulated test client. It loads configuration, initializes
//! logging, and runs until interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `teststand-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the shared application state
//! 4. Start the HTTP + `WebSocket` server
//! 5. Start the simulated client (when enabled)
//! 6. Wait for Ctrl-C

mod error;
mod simulator;

use std::path::Path;
use std::sync::Arc;

use teststand_api::state::AppState;
use teststand_core::config::BridgeConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::BridgeError;

/// Application entry point for the bridge.
///
/// # Errors
///
/// Returns an error if configuration loading or server startup fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration before logging so the level can come from it.
    let config_path = Path::new("teststand-config.yaml");
    let config = load_config(config_path)?;

    // 2. Initialize structured logging. RUST_LOG wins over the file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("teststand-bridge starting");
    info!(
        config_file = config_path.exists(),
        host = config.server.host,
        port = config.server.port,
        simulator_enabled = config.simulator.enabled,
        "Configuration loaded"
    );

    // 3. Build shared application state.
    let state = Arc::new(AppState::new());

    // 4. Start the HTTP + WebSocket server.
    let _api_handle = teststand_api::spawn_api(config.server.port, Arc::clone(&state))
        .await
        .map_err(BridgeError::from)?;
    info!(port = config.server.port, "Bridge server started");

    // 5. Start the simulated client.
    let _sim_handles = if config.simulator.enabled {
        simulator::spawn_simulator(config.simulator, Arc::clone(&state))
    } else {
        info!("Simulated client disabled");
        Vec::new()
    };

    // 6. Run until interrupted.
    tokio::signal::ctrl_c().await?;
    info!("teststand-bridge shutdown complete");

    Ok(())
}

/// Load the bridge configuration from the given path.
///
/// Falls back to defaults (with environment overrides applied) when
/// the file does not exist.
fn load_config(path: &Path) -> Result<BridgeConfig, BridgeError> {
    if path.exists() {
        Ok(BridgeConfig::from_file(path)?)
    } else {
        let mut config = BridgeConfig::default();
        config.server.apply_env_overrides();
        Ok(config)
    }
}
