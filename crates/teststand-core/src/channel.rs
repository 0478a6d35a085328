//! One-way publish capability for start-test signals.
//!
//! The coordinator broadcasts [`StartTestSignal`]s through this trait
//! without knowing the transport. Publish is fire-and-forget: success
//! means the local transport accepted the message, never that any
//! subscriber received it.

use teststand_types::StartTestSignal;

/// Errors from the local side of the event channel.
///
/// Having zero subscribers is explicitly *not* an error -- a broadcast
/// into an empty room still succeeds with a receiver count of 0.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The transport rejected or failed to accept the message locally.
    #[error("channel send failed: {0}")]
    Send(String),
}

/// Abstract publish/subscribe transport for workflow-start signals.
///
/// Implementations must be cheap to call from request handlers: the
/// coordinator invokes [`publish`](Self::publish) synchronously on the
/// request path and does not wait for delivery.
pub trait EventChannel: Send + Sync {
    /// Broadcast a start signal to all current subscribers.
    ///
    /// Returns the number of subscribers the message was handed to
    /// (0 when nobody is listening, which is fine).
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Send`] only when the local transport
    /// itself fails; delivery to subscribers is never confirmed.
    fn publish(&self, signal: &StartTestSignal) -> Result<usize, ChannelError>;
}
