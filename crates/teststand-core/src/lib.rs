//! Core workflow coordination for the Teststand battery test bridge.
//!
//! This crate holds the only mutable shared state in the system and the
//! logic that guards it:
//!
//! - [`gate`] -- the single-flight admission gate (one test in flight,
//!   system-wide)
//! - [`registry`] -- per-battery monotonically increasing test numbers
//! - [`coordinator`] -- the start → broadcast → await-callbacks workflow
//! - [`channel`] -- the one-way publish capability the coordinator emits
//!   start signals through
//! - [`telemetry`] -- duration and delay reporting
//! - [`config`] -- YAML configuration for the bridge binary
//!
//! # Architecture
//!
//! The coordinator is deliberately stateless about in-flight runs beyond
//! the busy flag: it admits a request, allocates a test number, publishes
//! a [`StartTestSignal`](teststand_types::StartTestSignal), and replies
//! immediately. The two completion callbacks arrive out of band; only the
//! analysis-done callback reopens the gate.

pub mod channel;
pub mod config;
pub mod coordinator;
pub mod gate;
pub mod registry;
pub mod telemetry;

// Re-export primary types for convenience.
pub use channel::{ChannelError, EventChannel};
pub use config::{BridgeConfig, ConfigError};
pub use coordinator::{CoordinatorError, StartTestCommand, WorkflowCoordinator};
pub use gate::SingleFlightGate;
pub use registry::SequenceRegistry;
pub use telemetry::{TelemetrySink, TracingTelemetry};
