//! `WebSocket` handler for the bidirectional event stream.
//!
//! Clients connect to `GET /ws/events` and immediately receive a
//! greeting frame. From then on the connection carries traffic in both
//! directions:
//!
//! - **Outbound**: each [`StartTestSignal`] the coordinator publishes
//!   is forwarded as a JSON-encoded [`ServerEvent`] text frame, via a
//!   [`broadcast::Receiver`] so all connected clients see the same
//!   stream.
//! - **Inbound**: text frames are parsed as [`ClientEvent`]s; the only
//!   accepted event is a temperature update, which lands in the shared
//!   latest-reading slot. Unparseable frames are logged and dropped.
//!
//! If a client falls behind, lagged signals are silently skipped and
//! the client resumes from the most recent one.
//!
//! [`broadcast::Receiver`]: tokio::sync::broadcast::Receiver
//! [`StartTestSignal`]: teststand_types::StartTestSignal

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use teststand_types::{ClientEvent, ClientId, ServerEvent};
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` connection and begin the
/// bidirectional event stream.
///
/// # Route
///
/// `GET /ws/events`
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Handle the `WebSocket` lifecycle: greet the client, subscribe to the
/// broadcast channel, forward start signals, and ingest temperature
/// updates.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let client_id = ClientId::new();
    debug!(%client_id, "WebSocket client connected");

    let mut rx = state.subscribe();

    // Greet the client so it can confirm the channel is live.
    let greeting = ServerEvent::Connected {
        message: String::from("Connected to teststand bridge"),
    };
    match serde_json::to_string(&greeting) {
        Ok(json) => {
            if socket.send(Message::Text(json.into())).await.is_err() {
                debug!(%client_id, "WebSocket client disconnected (greeting failed)");
                return;
            }
        }
        Err(e) => {
            warn!(%client_id, "Failed to serialize greeting: {e}");
        }
    }

    loop {
        tokio::select! {
            // Receive a start signal from the coordinator.
            result = rx.recv() => {
                match result {
                    Ok(signal) => {
                        let event = ServerEvent::StartTestSignal(signal);
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                warn!(%client_id, "Failed to serialize start signal: {e}");
                                continue;
                            }
                        };
                        let msg: Message = Message::Text(json.into());
                        if socket.send(msg).await.is_err() {
                            debug!(%client_id, "WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        debug!(%client_id, skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        debug!(%client_id, "Broadcast channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            // Handle inbound frames from the client.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_frame(&state, client_id, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%client_id, "WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let pong = Message::Pong(data);
                        if socket.send(pong).await.is_err() {
                            debug!(%client_id, "WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%client_id, "WebSocket error: {e}");
                        return;
                    }
                    _ => {
                        // Ignore other message types (binary, pong).
                    }
                }
            }
        }
    }
}

/// Parse and apply a single inbound text frame.
///
/// Malformed frames are logged at debug level and dropped; a bad frame
/// never tears down the connection.
async fn handle_client_frame(state: &AppState, client_id: ClientId, text: &str) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(ClientEvent::TemperatureUpdate(update)) => {
            debug!(
                %client_id,
                temperature = update.temperature,
                "Received temperature update"
            );
            state.apply_temperature_update(&update).await;
        }
        Err(e) => {
            debug!(%client_id, "Ignoring unparseable client frame: {e}");
        }
    }
}
