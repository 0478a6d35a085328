//! REST endpoint handlers for the gateway server.
//!
//! All handlers operate on the shared [`AppState`]; the start-test
//! handler delegates the whole workflow to the coordinator and maps its
//! rejections onto HTTP statuses via [`ApiError`].
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `PUT` | `/api/test` | Initiate a battery test run |
//! | `GET`/`POST` | `/api/callbacks/test-done` | Test completion signal |
//! | `GET`/`POST` | `/api/callbacks/analysis-done` | Analysis completion signal |
//! | `GET` | `/api/temperature` | Latest temperature reading |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use teststand_core::coordinator::StartTestCommand;
use teststand_types::TemperatureResponse;

use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `PUT /api/test`.
///
/// Both parameters are required; they are optional here so that their
/// absence reaches the coordinator's validation (and its 400 message)
/// instead of an extractor rejection.
#[derive(Debug, serde::Deserialize)]
pub struct StartTestQuery {
    /// Identifier of the battery under test.
    #[serde(rename = "batteryId")]
    pub battery_id: Option<String>,

    /// Reference date for the battery.
    #[serde(rename = "batteryRefDate")]
    pub battery_ref_date: Option<String>,
}

/// Request body for `PUT /api/test`.
#[derive(Debug, serde::Deserialize)]
pub struct StartTestBody {
    /// URL to call when the physical test completes.
    #[serde(rename = "testDoneCallbackURL")]
    pub test_done_callback_url: Option<String>,

    /// URL to call when the post-test analysis completes.
    #[serde(rename = "analysisDoneCallbackURL")]
    pub analysis_done_callback_url: Option<String>,
}

/// Generic callback acknowledgment.
#[derive(Debug, serde::Serialize)]
struct CallbackResponse {
    /// Whether the callback was accepted (always true).
    ok: bool,
    /// Human-readable message.
    message: String,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing bridge status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let busy = if state.coordinator.is_busy() {
        "BUSY"
    } else {
        "IDLE"
    };
    let batteries = state.coordinator.batteries_tested().await;
    let temperature = state.latest_temperature().await.map_or_else(
        || String::from("none"),
        |r| format!("{:.1} °C", r.temperature),
    );

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Teststand Bridge</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Teststand Bridge</h1>
    <p class="subtitle">Battery test relay -- REST + WebSocket</p>

    <div>
        <div class="metric">
            <div class="label">Gate</div>
            <div class="value">{busy}</div>
        </div>
        <div class="metric">
            <div class="label">Batteries tested</div>
            <div class="value">{batteries}</div>
        </div>
        <div class="metric">
            <div class="label">Latest reading</div>
            <div class="value">{temperature}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li>PUT <a href="/api/test">/api/test</a>?batteryId=..&amp;batteryRefDate=.. -- initiate a test run</li>
        <li>GET <a href="/api/temperature">/api/temperature</a> -- latest temperature reading</li>
        <li>GET/POST /api/callbacks/test-done -- test completion signal</li>
        <li>GET/POST /api/callbacks/analysis-done -- analysis completion signal (reopens the gate)</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li><code>ws://host:port/ws/events</code> -- start-test signal stream, temperature ingestion</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// PUT /api/test -- initiate a test run
// ---------------------------------------------------------------------------

/// Initiate a battery test run.
///
/// Validates the required fields, admits the run through the
/// single-flight gate, allocates the per-battery test number, publishes
/// the start signal, and acknowledges immediately. The gate stays Busy
/// until the analysis-done callback arrives.
///
/// # Responses
///
/// - `200` with the test acknowledgment
/// - `400` when a required field is missing
/// - `429` when a test is already running
pub async fn start_test(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StartTestQuery>,
    Json(body): Json<StartTestBody>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = StartTestCommand {
        battery_id: params.battery_id.unwrap_or_default(),
        battery_ref_date: params.battery_ref_date.unwrap_or_default(),
        test_done_callback_url: body.test_done_callback_url.unwrap_or_default(),
        analysis_done_callback_url: body.analysis_done_callback_url.unwrap_or_default(),
    };

    let ack = state.coordinator.start_test(cmd).await?;
    Ok(Json(ack))
}

// ---------------------------------------------------------------------------
// GET|POST /api/callbacks/test-done -- test completion signal
// ---------------------------------------------------------------------------

/// Accept the test-done signal.
///
/// Any payload (or none) is accepted and acknowledged; no schema is
/// enforced and no state changes -- only analysis-done reopens the gate.
pub async fn test_done(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    state.coordinator.handle_test_done(&lenient_payload(&body));
    Json(CallbackResponse {
        ok: true,
        message: String::from("Test done"),
    })
}

// ---------------------------------------------------------------------------
// GET|POST /api/callbacks/analysis-done -- analysis completion signal
// ---------------------------------------------------------------------------

/// Accept the analysis-done signal and reopen the gate.
///
/// Any payload (or none) is accepted and acknowledged. Releasing an
/// already-Idle gate is a no-op.
pub async fn analysis_done(
    State(state): State<Arc<AppState>>,
    body: axum::body::Bytes,
) -> impl IntoResponse {
    state.coordinator.handle_analysis_done(&lenient_payload(&body));
    Json(CallbackResponse {
        ok: true,
        message: String::from("Analysis done"),
    })
}

/// Parse a callback body as JSON if possible, falling back to null.
/// Callbacks carry arbitrary payloads (or none on GET).
fn lenient_payload(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap_or(serde_json::Value::Null)
}

// ---------------------------------------------------------------------------
// GET /api/temperature -- latest temperature reading
// ---------------------------------------------------------------------------

/// Return the most recent temperature reading, or 404 if none has ever
/// been received.
pub async fn get_temperature(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    state.latest_temperature().await.map_or_else(
        || Err(ApiError::NotFound(String::from("No temperature received yet"))),
        |reading| Ok(Json(TemperatureResponse::from(&reading))),
    )
}
