//! Shared application state for the gateway API server.
//!
//! [`AppState`] holds the broadcast channel for start-test signals, the
//! workflow coordinator (which owns the gate and the sequence
//! registry), and the single latest-temperature slot that the REST
//! query serves. The state is built per instance and injected via
//! Axum's `State` extractor -- nothing lives in process-wide globals.

use std::sync::Arc;

use teststand_core::channel::{ChannelError, EventChannel};
use teststand_core::coordinator::WorkflowCoordinator;
use teststand_core::telemetry::{TelemetrySink, TracingTelemetry, epoch_seconds, one_way_delay_ms};
use teststand_types::{StartTestSignal, TemperatureReading, TemperatureUpdate};
use tokio::sync::{RwLock, broadcast};

/// Capacity of the broadcast channel for start-test signals.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
const BROADCAST_CAPACITY: usize = 256;

/// [`EventChannel`] implementation over a Tokio broadcast sender.
///
/// Fire-and-forget: handing the signal to the sender is success, and
/// zero connected receivers is a normal outcome, not an error.
#[derive(Debug, Clone)]
pub struct BroadcastChannel {
    tx: broadcast::Sender<StartTestSignal>,
}

impl BroadcastChannel {
    /// Wrap an existing broadcast sender.
    pub const fn new(tx: broadcast::Sender<StartTestSignal>) -> Self {
        Self { tx }
    }
}

impl EventChannel for BroadcastChannel {
    fn publish(&self, signal: &StartTestSignal) -> Result<usize, ChannelError> {
        // send returns Err only when there are zero receivers,
        // which is normal when no WebSocket clients are connected.
        Ok(self.tx.send(signal.clone()).unwrap_or(0))
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The
/// broadcast sender pushes start signals to all connected `WebSocket`
/// clients; the coordinator serializes test runs; the reading slot is
/// last-write-wins with no history.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast sender for start-test signals.
    pub tx: broadcast::Sender<StartTestSignal>,
    /// The workflow coordinator (gate + registry + publish).
    pub coordinator: Arc<WorkflowCoordinator>,
    /// The single latest-temperature slot.
    pub latest_reading: Arc<RwLock<Option<TemperatureReading>>>,
    /// Telemetry sink shared with the coordinator.
    pub telemetry: Arc<dyn TelemetrySink>,
}

impl AppState {
    /// Create application state with the production tracing telemetry.
    pub fn new() -> Self {
        Self::with_telemetry(Arc::new(TracingTelemetry::new()))
    }

    /// Create application state with a caller-supplied telemetry sink.
    pub fn with_telemetry(telemetry: Arc<dyn TelemetrySink>) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let channel = Arc::new(BroadcastChannel::new(tx.clone()));
        let coordinator = Arc::new(WorkflowCoordinator::new(channel, Arc::clone(&telemetry)));
        Self {
            tx,
            coordinator,
            latest_reading: Arc::new(RwLock::new(None)),
            telemetry,
        }
    }

    /// Subscribe to the start-test broadcast channel.
    ///
    /// Returns a receiver that yields every [`StartTestSignal`] the
    /// coordinator publishes from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<StartTestSignal> {
        self.tx.subscribe()
    }

    /// Store a temperature update in the latest-reading slot
    /// (last-write-wins) and report the one-way delivery delay when the
    /// sender stamped an emit time.
    pub async fn apply_temperature_update(&self, update: &TemperatureUpdate) {
        {
            let mut slot = self.latest_reading.write().await;
            *slot = Some(TemperatureReading::now(update.temperature));
        }

        if let Some(emit_time) = update.frontend_emit_time {
            let delay_ms = one_way_delay_ms(emit_time, epoch_seconds());
            self.telemetry.channel_delay("client -> bridge", delay_ms);
        }
    }

    /// The most recent temperature reading, if any was ever received.
    pub async fn latest_temperature(&self) -> Option<TemperatureReading> {
        self.latest_reading.read().await.clone()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
