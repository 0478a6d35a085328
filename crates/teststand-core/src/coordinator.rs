//! The start-test workflow coordinator.
//!
//! Sequencing per attempt: validate → admit → allocate → publish → ack.
//! The acknowledgment is returned as soon as the signal is handed to the
//! local transport; the coordinator never waits for subscriber delivery
//! or for the completion callbacks. The two callbacks arrive out of band
//! in either order (or not at all) and are handled by
//! [`handle_test_done`](WorkflowCoordinator::handle_test_done) /
//! [`handle_analysis_done`](WorkflowCoordinator::handle_analysis_done).
//!
//! Release is asymmetric on purpose: a run is only finished once its
//! *analysis* completes, so test-done leaves the gate Busy.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use teststand_types::{RunId, StartTestSignal, TestAck};
use tracing::{debug, info, warn};

use crate::channel::{ChannelError, EventChannel};
use crate::gate::SingleFlightGate;
use crate::registry::SequenceRegistry;
use crate::telemetry::{TelemetrySink, epoch_seconds};

/// Route label used when reporting start-request handling durations.
const START_ROUTE: &str = "PUT /api/test";

/// Validated-on-entry input for one start-test attempt.
#[derive(Debug, Clone, Default)]
pub struct StartTestCommand {
    /// Opaque identifier of the battery under test.
    pub battery_id: String,
    /// Reference date supplied by the requester.
    pub battery_ref_date: String,
    /// URL to call when the physical test completes.
    pub test_done_callback_url: String,
    /// URL to call when the post-test analysis completes.
    pub analysis_done_callback_url: String,
}

/// Failure modes of one start-test attempt.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// A required field was empty or absent. Raised before any state
    /// mutation -- the gate and registry are untouched.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Another test workflow is already in flight.
    #[error("A test is already running. Please wait until it completes.")]
    Busy,

    /// The local transport failed to accept the start signal. The gate
    /// stays Busy (a well-defined state) until analysis-done arrives or
    /// the process restarts.
    #[error("publish failed: {source}")]
    Publish {
        /// The underlying channel error.
        #[from]
        source: ChannelError,
    },
}

/// Orchestrates start-test attempts against the gate and the registry.
///
/// Owns all mutable shared state; request handlers hold this behind an
/// [`Arc`] instead of reaching for process-wide globals, so tests get a
/// fresh coordinator each and multiple instances can coexist.
pub struct WorkflowCoordinator {
    gate: SingleFlightGate,
    registry: SequenceRegistry,
    channel: Arc<dyn EventChannel>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl WorkflowCoordinator {
    /// Create a coordinator with an Idle gate and an empty registry.
    pub fn new(channel: Arc<dyn EventChannel>, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self {
            gate: SingleFlightGate::new(),
            registry: SequenceRegistry::new(),
            channel,
            telemetry,
        }
    }

    /// Whether a test workflow is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Last allocated test number for a battery, if any.
    pub async fn tests_started(&self, battery_id: &str) -> Option<u64> {
        self.registry.count(battery_id).await
    }

    /// Number of distinct batteries that have started at least one test.
    pub async fn batteries_tested(&self) -> usize {
        self.registry.len().await
    }

    /// Run one start-test attempt end to end.
    ///
    /// On success the gate is left Busy and the returned [`TestAck`]
    /// echoes the allocated test number and timestamps. Rejections for
    /// missing fields or a busy gate leave all state untouched.
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::MissingField`] before any mutation,
    /// [`CoordinatorError::Busy`] when admission loses, or
    /// [`CoordinatorError::Publish`] when the local transport fails
    /// after admission.
    pub async fn start_test(&self, cmd: StartTestCommand) -> Result<TestAck, CoordinatorError> {
        let handling_started = Instant::now();

        validate(&cmd)?;

        if !self.gate.try_admit() {
            debug!(battery_id = cmd.battery_id, "start rejected, gate busy");
            return Err(CoordinatorError::Busy);
        }

        let run = RunId::new();
        let test_id = self.registry.allocate(&cmd.battery_id).await;

        let now = Utc::now();
        let test_date = now.format("%Y-%m-%d").to_string();
        let test_time = now.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let signal = StartTestSignal {
            start: true,
            battery_id: cmd.battery_id.clone(),
            battery_ref_date: cmd.battery_ref_date.clone(),
            test_done_callback_url: cmd.test_done_callback_url,
            analysis_done_callback_url: cmd.analysis_done_callback_url,
            test_id,
            test_date: test_date.clone(),
            test_time: test_time.clone(),
            // Stamped immediately before the publish call so receivers
            // can measure one-way delivery latency.
            backend_emit_time: epoch_seconds(),
        };

        match self.channel.publish(&signal) {
            Ok(receivers) => {
                debug!(%run, receivers, "start signal published");
            }
            Err(e) => {
                // No retry. The gate stays Busy until analysis-done.
                warn!(%run, error = %e, "start signal publish failed");
                return Err(e.into());
            }
        }

        self.telemetry
            .api_duration(START_ROUTE, handling_started.elapsed());

        info!(
            %run,
            battery_id = signal.battery_id,
            test_id,
            "test started"
        );

        Ok(TestAck {
            battery_id: signal.battery_id,
            battery_ref_date: signal.battery_ref_date,
            test_id,
            test_date,
            test_time,
        })
    }

    /// Handle the test-done callback.
    ///
    /// Accepts any payload and changes no state -- the workflow is only
    /// finished once analysis completes.
    pub fn handle_test_done(&self, payload: &serde_json::Value) {
        info!(payload = %payload, "test-done callback received");
    }

    /// Handle the analysis-done callback: log the payload and reopen
    /// the gate. Accepts any payload; idempotent when no run is in
    /// flight.
    pub fn handle_analysis_done(&self, payload: &serde_json::Value) {
        info!(payload = %payload, "analysis-done callback received");
        self.gate.release();
    }
}

/// Reject commands with empty required fields before any state mutation.
fn validate(cmd: &StartTestCommand) -> Result<(), CoordinatorError> {
    if cmd.battery_id.is_empty() {
        return Err(CoordinatorError::MissingField("batteryId"));
    }
    if cmd.battery_ref_date.is_empty() {
        return Err(CoordinatorError::MissingField("batteryRefDate"));
    }
    if cmd.test_done_callback_url.is_empty() {
        return Err(CoordinatorError::MissingField("testDoneCallbackURL"));
    }
    if cmd.analysis_done_callback_url.is_empty() {
        return Err(CoordinatorError::MissingField("analysisDoneCallbackURL"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;

    /// Channel that records every published signal.
    #[derive(Default)]
    struct RecordingChannel {
        signals: Mutex<Vec<StartTestSignal>>,
    }

    impl RecordingChannel {
        fn published(&self) -> Vec<StartTestSignal> {
            self.signals.lock().unwrap().clone()
        }
    }

    impl EventChannel for RecordingChannel {
        fn publish(&self, signal: &StartTestSignal) -> Result<usize, ChannelError> {
            self.signals.lock().unwrap().push(signal.clone());
            Ok(1)
        }
    }

    /// Channel whose local send always fails.
    struct FailingChannel;

    impl EventChannel for FailingChannel {
        fn publish(&self, _signal: &StartTestSignal) -> Result<usize, ChannelError> {
            Err(ChannelError::Send(String::from("transport down")))
        }
    }

    /// Sink that records durations for assertions.
    #[derive(Default)]
    struct RecordingSink {
        durations: Mutex<Vec<(String, Duration)>>,
    }

    impl TelemetrySink for RecordingSink {
        fn api_duration(&self, route: &str, elapsed: Duration) {
            self.durations
                .lock()
                .unwrap()
                .push((route.to_owned(), elapsed));
        }

        fn channel_delay(&self, _direction: &str, _delay_ms: f64) {}
    }

    fn command(battery_id: &str) -> StartTestCommand {
        StartTestCommand {
            battery_id: battery_id.to_owned(),
            battery_ref_date: String::from("2024-01-01"),
            test_done_callback_url: String::from("http://localhost:5000/cb/test-done"),
            analysis_done_callback_url: String::from("http://localhost:5000/cb/analysis-done"),
        }
    }

    fn coordinator_with(
        channel: Arc<dyn EventChannel>,
    ) -> (WorkflowCoordinator, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let coordinator = WorkflowCoordinator::new(channel, Arc::clone(&sink) as _);
        (coordinator, sink)
    }

    #[tokio::test]
    async fn successful_start_publishes_and_acks() {
        let channel = Arc::new(RecordingChannel::default());
        let (coordinator, sink) = coordinator_with(Arc::clone(&channel) as _);

        let ack = coordinator.start_test(command("B1")).await.unwrap();
        assert_eq!(ack.battery_id, "B1");
        assert_eq!(ack.test_id, 1);
        assert_eq!(ack.test_date.len(), "2024-01-01".len());
        assert!(coordinator.is_busy());

        let published = channel.published();
        assert_eq!(published.len(), 1);
        let signal = &published[0];
        assert!(signal.start);
        assert_eq!(signal.test_id, 1);
        assert_eq!(signal.test_time, ack.test_time);
        assert!(signal.backend_emit_time > 0.0);

        // Exactly one handling duration was reported.
        assert_eq!(sink.durations.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_start_is_rejected_busy_with_no_side_effects() {
        let channel = Arc::new(RecordingChannel::default());
        let (coordinator, _sink) = coordinator_with(Arc::clone(&channel) as _);

        let first = coordinator.start_test(command("B1")).await.unwrap();
        assert_eq!(first.test_id, 1);

        let second = coordinator.start_test(command("B1")).await;
        assert!(matches!(second, Err(CoordinatorError::Busy)));

        // Registry untouched, nothing broadcast for the rejection.
        assert_eq!(coordinator.tests_started("B1").await, Some(1));
        assert_eq!(channel.published().len(), 1);
    }

    #[tokio::test]
    async fn missing_field_rejects_before_any_mutation() {
        let channel = Arc::new(RecordingChannel::default());
        let (coordinator, _sink) = coordinator_with(Arc::clone(&channel) as _);

        let mut cmd = command("B1");
        cmd.analysis_done_callback_url.clear();
        let result = coordinator.start_test(cmd).await;
        assert!(matches!(
            result,
            Err(CoordinatorError::MissingField("analysisDoneCallbackURL"))
        ));

        // Gate still Idle, registry still empty, nothing published.
        assert!(!coordinator.is_busy());
        assert_eq!(coordinator.tests_started("B1").await, None);
        assert!(channel.published().is_empty());

        // A valid request still goes through afterwards.
        let ack = coordinator.start_test(command("B1")).await.unwrap();
        assert_eq!(ack.test_id, 1);
    }

    #[tokio::test]
    async fn analysis_done_reopens_exactly_one_admission() {
        let channel = Arc::new(RecordingChannel::default());
        let (coordinator, _sink) = coordinator_with(channel as _);

        coordinator.start_test(command("B1")).await.unwrap();
        coordinator.handle_analysis_done(&serde_json::json!({"result": "pass"}));
        assert!(!coordinator.is_busy());

        let ack = coordinator.start_test(command("B1")).await.unwrap();
        assert_eq!(ack.test_id, 2);
        assert!(matches!(
            coordinator.start_test(command("B1")).await,
            Err(CoordinatorError::Busy)
        ));
    }

    #[tokio::test]
    async fn test_done_does_not_release_the_gate() {
        let channel = Arc::new(RecordingChannel::default());
        let (coordinator, _sink) = coordinator_with(channel as _);

        coordinator.start_test(command("B1")).await.unwrap();
        coordinator.handle_test_done(&serde_json::json!({"status": "completed"}));
        assert!(coordinator.is_busy());
        assert!(matches!(
            coordinator.start_test(command("B1")).await,
            Err(CoordinatorError::Busy)
        ));
    }

    #[tokio::test]
    async fn analysis_done_without_a_run_is_a_noop() {
        let channel = Arc::new(RecordingChannel::default());
        let (coordinator, _sink) = coordinator_with(channel as _);

        coordinator.handle_analysis_done(&serde_json::json!({}));
        assert!(!coordinator.is_busy());

        let ack = coordinator.start_test(command("B1")).await.unwrap();
        assert_eq!(ack.test_id, 1);
    }

    #[tokio::test]
    async fn publish_failure_is_surfaced_and_gate_stays_busy() {
        let (coordinator, _sink) = coordinator_with(Arc::new(FailingChannel) as _);

        let result = coordinator.start_test(command("B1")).await;
        assert!(matches!(result, Err(CoordinatorError::Publish { .. })));
        // Well-defined state: Busy until analysis-done or restart.
        assert!(coordinator.is_busy());

        coordinator.handle_analysis_done(&serde_json::json!({}));
        assert!(!coordinator.is_busy());
    }
}
