//! Shared type definitions for the Teststand battery test bridge.
//!
//! This crate is the single source of truth for everything that crosses a
//! process or channel boundary: the start-test broadcast signal, the HTTP
//! acknowledgment, temperature readings, and the WebSocket event
//! envelopes. Field names are pinned with explicit serde renames because
//! external clients match on the exact JSON keys.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for log correlation
//! - [`messages`] -- Start-test signal, acknowledgment, WebSocket envelopes
//! - [`readings`] -- Latest-temperature slot value and API response body

pub mod ids;
pub mod messages;
pub mod readings;

// Re-export all public types at crate root for convenience.
pub use ids::{ClientId, RunId};
pub use messages::{ClientEvent, ServerEvent, StartTestSignal, TemperatureUpdate, TestAck};
pub use readings::{TemperatureReading, TemperatureResponse};
