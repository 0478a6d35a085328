//! Gateway API server for the Teststand battery test bridge.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/events`) streaming start-test
//!   signals to clients via [`tokio::sync::broadcast`] and accepting
//!   temperature updates from them
//! - **REST endpoints** for initiating a test run, receiving the two
//!   completion callbacks, and querying the latest temperature
//! - **Minimal HTML status page** (`GET /`) showing the gate state,
//!   counters, and links to the API endpoints
//!
//! # Architecture
//!
//! All handlers operate on an injectable [`AppState`]: the workflow
//! coordinator (gate + registry), the broadcast sender, and the single
//! latest-reading slot. There are no process-wide globals, so tests get
//! fresh state per router and multiple bridges can coexist in one
//! process.
//!
//! [`AppState`]: state::AppState

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use startup::{StartupError, spawn_api};
pub use state::{AppState, BroadcastChannel};
