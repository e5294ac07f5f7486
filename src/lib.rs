//! chatrelay - real-time group chat relay.
//!
//! Clients connect over WebSockets, join with a display name, and every
//! chat message is fanned out to the whole room. Arrivals and departures
//! are announced and followed by a fresh roster.

pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod server;

pub use connection::{ClientSender, Connection, ConnectionId, FrameSink, SinkClosed};
pub use error::ServerError;
pub use protocol::{ChatMessage, ClientMessage, PresenceSnapshot, ServerMessage};
pub use registry::{PresenceRecord, Registry};
pub use relay::{IgnoreReason, Relay, RelayOutcome};
