//! Wire messages exchanged between the bridge, WebSocket clients, and
//! callback callers.
//!
//! The JSON key spelling here is a compatibility contract: external test
//! rigs and the simulated client match on keys like `batteryId` and
//! `testDoneCallbackURL`, so every field carries an explicit
//! `#[serde(rename)]` rather than relying on a container-level rename
//! rule (which would produce `testDoneCallbackUrl`).

use serde::{Deserialize, Serialize};

/// Broadcast payload announcing that a battery test should start.
///
/// Published on the event channel the instant a start request is
/// admitted, and forwarded verbatim to every connected WebSocket client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartTestSignal {
    /// Always `true`; retained for wire compatibility with clients that
    /// gate on the flag rather than the event name.
    pub start: bool,

    /// Opaque identifier of the battery under test.
    #[serde(rename = "batteryId")]
    pub battery_id: String,

    /// Reference date supplied by the requester (not interpreted here).
    #[serde(rename = "batteryRefDate")]
    pub battery_ref_date: String,

    /// URL to call once the physical test completes.
    #[serde(rename = "testDoneCallbackURL")]
    pub test_done_callback_url: String,

    /// URL to call once the post-test analysis completes.
    #[serde(rename = "analysisDoneCallbackURL")]
    pub analysis_done_callback_url: String,

    /// Per-battery monotonically increasing test number (1-based).
    #[serde(rename = "testId")]
    pub test_id: u64,

    /// Test date, `YYYY-MM-DD`.
    #[serde(rename = "testDate")]
    pub test_date: String,

    /// Test timestamp, `YYYY-MM-DD HH:MM:SS.mmm` (millisecond precision).
    #[serde(rename = "testTime")]
    pub test_time: String,

    /// Epoch seconds (fractional) captured immediately before publish,
    /// so receivers can measure one-way delivery latency.
    #[serde(rename = "backendEmitTime")]
    pub backend_emit_time: f64,
}

/// Acknowledgment returned to the caller of the start-test request.
///
/// Echoes the identifying fields of the admitted run; deliberately does
/// not include the callback URLs or the emit timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAck {
    /// Opaque identifier of the battery under test.
    #[serde(rename = "batteryId")]
    pub battery_id: String,

    /// Reference date echoed from the request.
    #[serde(rename = "batteryRefDate")]
    pub battery_ref_date: String,

    /// Allocated per-battery test number.
    #[serde(rename = "testId")]
    pub test_id: u64,

    /// Test date, `YYYY-MM-DD`.
    #[serde(rename = "testDate")]
    pub test_date: String,

    /// Test timestamp, `YYYY-MM-DD HH:MM:SS.mmm`.
    #[serde(rename = "testTime")]
    pub test_time: String,
}

/// Temperature reading pushed by a client over the WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemperatureUpdate {
    /// The reading value in degrees Celsius.
    pub temperature: f64,

    /// Epoch seconds (fractional) at which the client emitted the
    /// reading. When present the bridge reports the one-way delay.
    #[serde(
        rename = "frontendEmitTime",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub frontend_emit_time: Option<f64>,
}

/// Envelope for frames the server sends to WebSocket clients.
///
/// Serialized as `{"event": "<name>", "data": {...}}` so clients can
/// dispatch on the event name before touching the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Greeting sent once when a client connects.
    Connected {
        /// Human-readable confirmation message.
        message: String,
    },

    /// A test-start announcement.
    StartTestSignal(StartTestSignal),
}

/// Envelope for frames WebSocket clients send to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A temperature reading from the client.
    TemperatureUpdate(TemperatureUpdate),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signal() -> StartTestSignal {
        StartTestSignal {
            start: true,
            battery_id: String::from("B1"),
            battery_ref_date: String::from("2024-01-01"),
            test_done_callback_url: String::from("http://localhost:5000/api/callbacks/test-done"),
            analysis_done_callback_url: String::from(
                "http://localhost:5000/api/callbacks/analysis-done",
            ),
            test_id: 1,
            test_date: String::from("2024-01-02"),
            test_time: String::from("2024-01-02 10:15:30.123"),
            backend_emit_time: 1_704_190_530.123,
        }
    }

    #[test]
    fn start_signal_uses_exact_wire_keys() {
        let json = serde_json::to_value(sample_signal()).unwrap_or_default();
        assert_eq!(json["start"], true);
        assert_eq!(json["batteryId"], "B1");
        assert_eq!(json["batteryRefDate"], "2024-01-01");
        assert!(json["testDoneCallbackURL"].is_string());
        assert!(json["analysisDoneCallbackURL"].is_string());
        assert_eq!(json["testId"], 1);
        assert_eq!(json["testDate"], "2024-01-02");
        assert_eq!(json["testTime"], "2024-01-02 10:15:30.123");
        assert!(json["backendEmitTime"].is_f64());
        // No snake_case leakage.
        assert!(json.get("battery_id").is_none());
        assert!(json.get("test_done_callback_url").is_none());
    }

    #[test]
    fn ack_uses_exact_wire_keys() {
        let ack = TestAck {
            battery_id: String::from("B1"),
            battery_ref_date: String::from("2024-01-01"),
            test_id: 3,
            test_date: String::from("2024-01-02"),
            test_time: String::from("2024-01-02 10:15:30.123"),
        };
        let json = serde_json::to_value(&ack).unwrap_or_default();
        assert_eq!(json["batteryId"], "B1");
        assert_eq!(json["testId"], 3);
        assert!(json.get("testDoneCallbackURL").is_none());
    }

    #[test]
    fn server_event_envelope_names() {
        let event = ServerEvent::StartTestSignal(sample_signal());
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["event"], "start_test_signal");
        assert_eq!(json["data"]["batteryId"], "B1");

        let greeting = ServerEvent::Connected {
            message: String::from("connected to teststand bridge"),
        };
        let json = serde_json::to_value(&greeting).unwrap_or_default();
        assert_eq!(json["event"], "connected");
    }

    #[test]
    fn client_event_roundtrip() {
        let raw = r#"{"event":"temperature_update","data":{"temperature":27.0,"frontendEmitTime":1704190530.5}}"#;
        let parsed: Result<ClientEvent, _> = serde_json::from_str(raw);
        assert!(parsed.is_ok());
        let ClientEvent::TemperatureUpdate(update) = parsed.unwrap_or(
            ClientEvent::TemperatureUpdate(TemperatureUpdate {
                temperature: 0.0,
                frontend_emit_time: None,
            }),
        );
        assert!((update.temperature - 27.0).abs() < f64::EPSILON);
        assert!(update.frontend_emit_time.is_some());
    }

    #[test]
    fn temperature_update_emit_time_is_optional() {
        let raw = r#"{"event":"temperature_update","data":{"temperature":19}}"#;
        let parsed: Result<ClientEvent, _> = serde_json::from_str(raw);
        assert!(parsed.is_ok());

        let update = TemperatureUpdate {
            temperature: 19.0,
            frontend_emit_time: None,
        };
        let json = serde_json::to_value(&update).unwrap_or_default();
        assert!(json.get("frontendEmitTime").is_none());
    }
}
