//! WebSocket transport adapter.
//!
//! Each socket gets a writer task draining its outbound queue and a reader
//! task feeding frames to the relay. Whichever finishes first ends the
//! connection, and the relay sees exactly one close event.
//!
//! The outbound queue is bounded by `server.outbound_queue`. A client that
//! lets it fill up is disconnected rather than buffered without limit.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::connection::ClientSender;
use crate::relay::RelayOutcome;
use crate::server::state::AppState;

/// WebSocket upgrade handler.
///
/// Requests that cannot be upgraded get a plain 500.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    match upgrade {
        Ok(ws) => ws
            .max_message_size(state.max_frame_bytes)
            .on_failed_upgrade(|e| tracing::warn!(error = %e, "WebSocket upgrade failed"))
            .on_upgrade(move |socket| handle_socket(socket, state)),
        Err(rejection) => {
            tracing::debug!(%rejection, "Rejected non-upgrade request");
            (StatusCode::INTERNAL_SERVER_ERROR, "Upgrade failed").into_response()
        }
    }
}

/// Handles an individual WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (tx, mut rx) = ClientSender::channel(state.outbound_queue);
    let overflow = tx.overflow_signal();
    let connection = state.relay.accept(tx);
    let conn_id = connection.id();

    tracing::debug!(conn_id = %conn_id, "WebSocket connection opened");

    // Drain the outbound queue into the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    let reader_state = Arc::clone(&state);
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let outcome = reader_state.relay.handle_frame(&connection, &text);
                    if let RelayOutcome::Ignored(reason) = outcome {
                        tracing::trace!(conn_id = %conn_id, ?reason, "Frame produced no broadcast");
                    }
                }
                Message::Binary(data) => {
                    tracing::debug!(conn_id = %conn_id, len = data.len(), "Discarding binary frame");
                }
                Message::Close(_) => break,
                // Pong replies are handled by axum
                Message::Ping(_) | Message::Pong(_) => {}
            }
        }
    });

    // The surviving task must have fully stopped before the close event, or
    // a frame it is still handling could land after the disconnect.
    tokio::select! {
        _ = &mut send_task => stop(recv_task).await,
        _ = &mut recv_task => stop(send_task).await,
        _ = overflow.notified() => {
            tracing::warn!(conn_id = %conn_id, "Outbound queue full, dropping slow client");
            stop(send_task).await;
            stop(recv_task).await;
        }
    }

    state.relay.disconnect(conn_id);
    tracing::debug!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Aborts `task` and waits until it is no longer running.
async fn stop(task: JoinHandle<()>) {
    task.abort();
    // Err(cancelled) is the expected result
    let _ = task.await;
}
