//! Duration and delay reporting.
//!
//! The bridge measures two things: how long the server-side handling of
//! a start request took (request arrival to acknowledgment, excluding
//! all downstream delivery), and the one-way delivery latency of channel
//! messages when the remote side stamped an emit time. Both are pushed
//! through [`TelemetrySink`] so tests can capture them and production
//! code can emit structured log lines.

use std::time::Duration;

use tracing::info;

/// Sink for timing measurements. Not part of the functional contract;
/// implementations must never fail the caller.
pub trait TelemetrySink: Send + Sync {
    /// Report the server-side handling duration of one request.
    fn api_duration(&self, route: &str, elapsed: Duration);

    /// Report a one-way delivery delay in milliseconds.
    ///
    /// `direction` names the hop, e.g. `"client -> bridge"`.
    fn channel_delay(&self, direction: &str, delay_ms: f64);
}

/// Production sink that emits timestamped tracing lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TracingTelemetry {
    /// Create a new tracing-backed sink.
    pub const fn new() -> Self {
        Self
    }
}

impl TelemetrySink for TracingTelemetry {
    fn api_duration(&self, route: &str, elapsed: Duration) {
        let millis = elapsed.as_secs_f64() * 1000.0;
        info!(route, duration_ms = format!("{millis:.5}"), "REST API duration");
    }

    fn channel_delay(&self, direction: &str, delay_ms: f64) {
        info!(direction, delay_ms = format!("{delay_ms:.2}"), "channel delay");
    }
}

/// Compute a one-way delay in milliseconds from two epoch-seconds
/// timestamps. Clamped at zero so skewed clocks never report negative
/// latency.
pub fn one_way_delay_ms(sender_emit_epoch: f64, receive_epoch: f64) -> f64 {
    ((receive_epoch - sender_emit_epoch) * 1000.0).max(0.0)
}

/// Current wall-clock time as fractional epoch seconds, the unit used
/// for emit timestamps on the wire.
pub fn epoch_seconds() -> f64 {
    let now = chrono::Utc::now();
    #[allow(clippy::cast_precision_loss)]
    let micros = now.timestamp_micros() as f64;
    micros / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_is_difference_in_millis() {
        let delay = one_way_delay_ms(100.0, 100.25);
        assert!((delay - 250.0).abs() < 1e-6);
    }

    #[test]
    fn skewed_clocks_clamp_to_zero() {
        assert!(one_way_delay_ms(200.0, 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn epoch_seconds_is_recent() {
        // Anything after 2020 and before 2100 is sane here.
        let now = epoch_seconds();
        assert!(now > 1_577_836_800.0);
        assert!(now < 4_102_444_800.0);
    }
}
