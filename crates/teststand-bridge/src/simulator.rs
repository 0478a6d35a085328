//! Simulated test client standing in for the external rig.
//!
//! The simulator exercises both directions of the bridge without any
//! real hardware attached:
//!
//! - A **temperature loop** pushes a random reading into the shared
//!   latest-reading slot on a fixed interval, stamping an emit time so
//!   the bridge reports delivery delay the same way it does for real
//!   `WebSocket` clients.
//! - A **test responder** subscribes to the start-signal broadcast and
//!   answers each signal by sleeping through the configured test and
//!   analysis durations, POSTing to the callback URLs carried in the
//!   signal after each phase. Callback failures are logged and never
//!   retried; a stuck gate is released by hand via the callback route.

use std::sync::Arc;
use std::time::Duration;

use teststand_api::state::AppState;
use teststand_core::config::SimulatorSettings;
use teststand_core::telemetry::{epoch_seconds, one_way_delay_ms};
use teststand_types::{StartTestSignal, TemperatureUpdate};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawn the simulator's background tasks.
///
/// Returns the task handles so the caller can abort them on shutdown.
pub fn spawn_simulator(settings: SimulatorSettings, state: Arc<AppState>) -> Vec<JoinHandle<()>> {
    let temperature = tokio::spawn(run_temperature_loop(
        settings.clone(),
        Arc::clone(&state),
    ));
    let responder = tokio::spawn(run_test_responder(settings, state));

    info!("Simulated client started");
    vec![temperature, responder]
}

/// Push a random temperature reading on the configured interval.
async fn run_temperature_loop(settings: SimulatorSettings, state: Arc<AppState>) {
    let period = Duration::from_millis(settings.reading_interval_ms.max(1));
    let mut interval = tokio::time::interval(period);

    // Guard against an inverted range in the config file.
    let lo = settings.temperature_min.min(settings.temperature_max);
    let hi = settings.temperature_min.max(settings.temperature_max);

    loop {
        interval.tick().await;

        let temperature = {
            use rand::Rng as _;
            rand::rng().random_range(lo..=hi)
        };
        debug!(temperature, "simulated temperature reading");

        let update = TemperatureUpdate {
            temperature,
            frontend_emit_time: Some(epoch_seconds()),
        };
        state.apply_temperature_update(&update).await;
    }
}

/// Answer start signals by running the simulated test lifecycle.
///
/// Signals are handled one at a time; the single-flight gate upstream
/// guarantees there is never more than one in flight anyway.
async fn run_test_responder(settings: SimulatorSettings, state: Arc<AppState>) {
    let client = reqwest::Client::new();
    let mut rx = state.subscribe();

    loop {
        match rx.recv().await {
            Ok(signal) => {
                let delay_ms = one_way_delay_ms(signal.backend_emit_time, epoch_seconds());
                state.telemetry.channel_delay("bridge -> client", delay_ms);
                run_simulated_test(&client, &settings, &signal).await;
            }
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "simulator lagged behind start signals");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                debug!("broadcast channel closed, stopping simulator");
                return;
            }
        }
    }
}

/// Sleep through the test and analysis phases, firing the matching
/// callback after each.
async fn run_simulated_test(
    client: &reqwest::Client,
    settings: &SimulatorSettings,
    signal: &StartTestSignal,
) {
    info!(
        battery_id = signal.battery_id,
        test_id = signal.test_id,
        "start signal received, running simulated test"
    );

    tokio::time::sleep(Duration::from_millis(settings.test_duration_ms)).await;
    post_callback(
        client,
        &signal.test_done_callback_url,
        &serde_json::json!({
            "batteryId": signal.battery_id,
            "testId": signal.test_id,
            "status": "completed",
        }),
    )
    .await;

    tokio::time::sleep(Duration::from_millis(settings.analysis_duration_ms)).await;
    post_callback(
        client,
        &signal.analysis_done_callback_url,
        &serde_json::json!({
            "batteryId": signal.battery_id,
            "testId": signal.test_id,
            "result": "pass",
        }),
    )
    .await;
}

/// POST a callback payload, logging the outcome. No retry.
async fn post_callback(client: &reqwest::Client, url: &str, payload: &serde_json::Value) {
    match client.post(url).json(payload).send().await {
        Ok(response) if response.status().is_success() => {
            debug!(url, "callback delivered");
        }
        Ok(response) => {
            warn!(url, status = %response.status(), "callback rejected");
        }
        Err(e) => {
            warn!(url, error = %e, "callback delivery failed");
        }
    }
}
