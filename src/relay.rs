//! Broadcast relay: turns connection events into room-wide broadcasts.
//!
//! Each event (join, chat message, close) is handled under one acquisition
//! of the room lock, covering both the registry mutation and the enqueue
//! of every resulting frame. Sinks are non-blocking queues, so the lock is
//! never held across network I/O, and all clients observe broadcasts in the
//! same order.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::connection::{Connection, ConnectionId, FrameSink};
use crate::protocol::{
    farewell_text, welcome_text, ChatMessage, ClientMessage, PresenceSnapshot, ServerMessage,
};
use crate::registry::Registry;

/// Why an event produced no broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Frame was not a known client message.
    Undecodable,
    /// Connection has not joined yet.
    NotJoined,
    /// Connection was already closed; late frames are dropped.
    Closed,
}

/// What the relay did with one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// A join was announced and the roster re-broadcast.
    Joined {
        user: String,
        /// Previous name when the connection joined again.
        replaced: Option<String>,
        recipients: usize,
    },
    /// A chat message was fanned out.
    Relayed { user: String, recipients: usize },
    /// A departure was announced to the remaining connections.
    Left { user: String, recipients: usize },
    Ignored(IgnoreReason),
}

/// Everything guarded by the room lock.
#[derive(Debug)]
struct Room<S> {
    registry: Registry<S>,
    /// Accepted and not yet closed. Closed is terminal: an id never returns.
    open: HashSet<ConnectionId>,
}

/// The room: owns the registry and hands out connection ids.
#[derive(Debug)]
pub struct Relay<S> {
    room: Mutex<Room<S>>,
    next_id: AtomicU64,
}

impl<S: FrameSink + Clone> Default for Relay<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: FrameSink + Clone> Relay<S> {
    /// Creates an empty room.
    pub fn new() -> Self {
        Self {
            room: Mutex::new(Room {
                registry: Registry::new(),
                open: HashSet::new(),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Wraps a freshly opened transport. The connection starts unregistered.
    pub fn accept(&self, sink: S) -> Connection<S> {
        let id = ConnectionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.room().open.insert(id);
        tracing::debug!(conn_id = %id, "Connection accepted");
        Connection::new(id, sink)
    }

    /// Handles one inbound text frame from `connection`.
    pub fn handle_frame(&self, connection: &Connection<S>, frame: &str) -> RelayOutcome {
        match ClientMessage::decode(frame) {
            Ok(ClientMessage::Join { user }) => self.join(connection, user),
            Ok(ClientMessage::Message { content }) => self.message(connection.id(), content),
            Err(e) => {
                tracing::debug!(conn_id = %connection.id(), error = %e, "Discarding frame");
                RelayOutcome::Ignored(IgnoreReason::Undecodable)
            }
        }
    }

    /// Registers the connection and announces it to the room.
    pub fn join(&self, connection: &Connection<S>, user: String) -> RelayOutcome {
        let mut room = self.room();

        if !room.open.contains(&connection.id()) {
            tracing::debug!(conn_id = %connection.id(), "Join after close dropped");
            return RelayOutcome::Ignored(IgnoreReason::Closed);
        }

        let replaced = room
            .registry
            .register(connection.clone(), user.clone())
            .map(|r| r.username);

        let announcement =
            ServerMessage::Join(ChatMessage::now(user.clone(), welcome_text(&user)));
        let recipients = broadcast(&room.registry, &announcement);
        broadcast_presence(&room.registry);

        tracing::info!(
            conn_id = %connection.id(),
            user = %user,
            online = room.registry.len(),
            "User joined"
        );

        RelayOutcome::Joined {
            user,
            replaced,
            recipients,
        }
    }

    /// Relays chat text under the sender's registered name.
    pub fn message(&self, id: ConnectionId, content: String) -> RelayOutcome {
        let room = self.room();

        if !room.open.contains(&id) {
            tracing::debug!(conn_id = %id, "Message after close dropped");
            return RelayOutcome::Ignored(IgnoreReason::Closed);
        }

        let Some(record) = room.registry.lookup(id) else {
            tracing::debug!(conn_id = %id, "Message from connection that never joined");
            return RelayOutcome::Ignored(IgnoreReason::NotJoined);
        };

        let user = record.username.clone();
        let recipients = broadcast(
            &room.registry,
            &ServerMessage::Message(ChatMessage::now(user.clone(), content)),
        );

        tracing::trace!(conn_id = %id, user = %user, recipients, "Message relayed");
        RelayOutcome::Relayed { user, recipients }
    }

    /// Handles the connection-closed event. Safe to call in any state, and
    /// any number of times; only the first call can announce a departure.
    pub fn disconnect(&self, id: ConnectionId) -> RelayOutcome {
        let mut room = self.room();
        room.open.remove(&id);

        let Some(record) = room.registry.remove(id) else {
            tracing::debug!(conn_id = %id, "Unregistered connection closed");
            return RelayOutcome::Ignored(IgnoreReason::NotJoined);
        };

        let user = record.username;
        let announcement =
            ServerMessage::Leave(ChatMessage::now(user.clone(), farewell_text(&user)));
        let recipients = broadcast(&room.registry, &announcement);
        broadcast_presence(&room.registry);

        tracing::info!(conn_id = %id, user = %user, online = room.registry.len(), "User left");
        RelayOutcome::Left { user, recipients }
    }

    /// Current roster, for "who's online" queries.
    pub fn presence(&self) -> PresenceSnapshot {
        PresenceSnapshot::now(self.room().registry.snapshot())
    }

    /// Number of joined connections.
    pub fn online_count(&self) -> usize {
        self.room().registry.len()
    }

    fn room(&self) -> MutexGuard<'_, Room<S>> {
        // Every critical section leaves the room consistent, so a
        // poisoned lock still guards valid data.
        self.room.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Sends the current roster to everyone in the room.
fn broadcast_presence<S: FrameSink>(registry: &Registry<S>) -> usize {
    broadcast(
        registry,
        &ServerMessage::Users(PresenceSnapshot::now(registry.snapshot())),
    )
}

/// Enqueues `message` to every registered connection.
///
/// A recipient that cannot take the frame (writer gone, or queue full) is
/// skipped; its session observes that and raises the close event itself.
/// Returns the number of successful enqueues.
fn broadcast<S: FrameSink>(registry: &Registry<S>, message: &ServerMessage) -> usize {
    let frame = match message.encode() {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!(?e, kind = message.kind(), "Failed to encode broadcast");
            return 0;
        }
    };

    let mut delivered = 0;
    for connection in registry.connections() {
        match connection.send(frame.clone()) {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::debug!(conn_id = %connection.id(), error = %e, "Skipping closed recipient");
            }
        }
    }
    delivered
}
