//! WebSocket Subscription Sessions
//!
//! The per-connection lifecycle: admit, push the initial snapshot,
//! relay broadcast ticks outbound and acknowledge inbound traffic,
//! detect disconnection, unregister.
//!
//! # Lifecycle
//!
//! Connecting -> Admitted -> Streaming -> Closed. Admission validates
//! the symbol against the fixed universe; unknown symbols get a policy
//! close (1008) and are never registered. An admitted session is
//! registered with a bounded outbound channel, receives one snapshot
//! tick before any broadcast-driven update, and unregisters itself
//! before its task exits.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code};
use axum::extract::{Path, State};
use axum::response::Response;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::domain::registry::{SubscriberId, next_subscriber_id};
use crate::infrastructure::http::SharedAppState;
use crate::infrastructure::metrics;

/// WebSocket upgrade handler for `/ws/{symbol}`.
pub async fn ws_handler(
    State(state): State<SharedAppState>,
    Path(symbol): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let symbol = symbol.to_uppercase();

    if state.service.is_known(&symbol) {
        ws.on_upgrade(move |socket| session(socket, state, symbol))
    } else {
        ws.on_upgrade(move |socket| reject(socket, symbol))
    }
}

/// Close an unknown-symbol connection with a policy violation code.
async fn reject(mut socket: WebSocket, symbol: String) {
    tracing::info!(symbol, "subscription rejected: unknown symbol");
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: format!("Symbol {symbol} not found").into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}

/// One admitted subscriber session, from registration to teardown.
async fn session(socket: WebSocket, state: SharedAppState, symbol: String) {
    let (mut sink, stream) = socket.split();
    let id = next_subscriber_id();
    let (tx, rx) = mpsc::channel(state.subscriber_capacity);

    state.registry.register(&symbol, id, tx);
    metrics::connection_opened();

    stream_ticks(&mut sink, stream, rx, &state, &symbol).await;

    // Synchronous unregister before the task exits; a broadcast racing
    // this at worst fails one send and removes the id again.
    state.registry.unregister(&symbol, id);
    metrics::connection_closed();
    tracing::debug!(symbol, id, "session closed");
}

/// The streaming phase: initial snapshot, then relay until disconnect.
async fn stream_ticks(
    sink: &mut SplitSink<WebSocket, Message>,
    mut stream: SplitStream<WebSocket>,
    mut rx: mpsc::Receiver<Arc<crate::domain::market::Tick>>,
    state: &SharedAppState,
    symbol: &str,
) {
    // A new subscriber never waits a full interval for its first value.
    let Some(snapshot) = state.service.snapshot(symbol).await else {
        return;
    };
    if send_json(sink, &snapshot).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            outbound = rx.recv() => {
                match outbound {
                    Some(tick) => {
                        if send_json(sink, tick.as_ref()).await.is_err() {
                            break;
                        }
                    }
                    // Channel closed: the broadcaster dropped us.
                    None => break,
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        // Echo acknowledgement; command handling is out
                        // of scope for the core.
                        let ack = serde_json::json!({
                            "status": "received",
                            "message": text.as_str(),
                        });
                        if send_json(sink, &ack).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ping/Pong/Binary: nothing to do
                    Some(Err(e)) => {
                        tracing::debug!(symbol, error = %e, "websocket receive error");
                        break;
                    }
                }
            }
        }
    }
}

async fn send_json<T: Serialize>(
    sink: &mut SplitSink<WebSocket, Message>,
    value: &T,
) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "outbound serialization failed");
            return Ok(());
        }
    };
    sink.send(Message::Text(payload.into())).await
}
