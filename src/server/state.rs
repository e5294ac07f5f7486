//! Shared application state for the HTTP server.

use crate::config::ServerConfig;
use crate::connection::ClientSender;
use crate::relay::Relay;

/// Application state shared across all handlers.
#[derive(Debug)]
pub struct AppState {
    /// The chat room every WebSocket joins.
    pub relay: Relay<ClientSender>,
    /// Largest inbound WebSocket message accepted.
    pub max_frame_bytes: usize,
    /// Capacity of each client's outbound queue.
    pub outbound_queue: usize,
}

impl AppState {
    /// Creates state with an empty room.
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            relay: Relay::new(),
            max_frame_bytes: config.max_frame_bytes,
            outbound_queue: config.outbound_queue,
        }
    }
}
