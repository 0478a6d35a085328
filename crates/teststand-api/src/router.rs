//! Axum router construction for the gateway API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the bridge server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/events` -- `WebSocket` event stream (start signals out,
///   temperature updates in)
/// - `PUT /api/test` -- initiate a battery test run
/// - `GET /api/temperature` -- latest temperature reading
/// - `GET|POST /api/callbacks/test-done` -- test completion signal
/// - `GET|POST /api/callbacks/analysis-done` -- analysis completion
///   signal (reopens the gate)
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/events", get(ws::ws_events))
        // REST API
        .route("/api/test", axum::routing::put(handlers::start_test))
        .route("/api/temperature", get(handlers::get_temperature))
        .route(
            "/api/callbacks/test-done",
            get(handlers::test_done).post(handlers::test_done),
        )
        .route(
            "/api/callbacks/analysis-done",
            get(handlers::analysis_done).post(handlers::analysis_done),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
