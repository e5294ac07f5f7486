//! Connection handles and the send capability the relay depends on.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::Notify;

/// Server-assigned identity of one transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The recipient can no longer take frames: its peer is gone or it fell
/// too far behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection sink closed")]
pub struct SinkClosed;

/// Non-blocking send capability for one connection.
///
/// Implementations must not wait on the network: the relay calls this while
/// holding the registry lock.
pub trait FrameSink: Send + Sync + 'static {
    fn send_frame(&self, frame: String) -> Result<(), SinkClosed>;
}

/// Outbound queue feeding one connection's writer task.
///
/// The queue is bounded. A frame that does not fit marks the connection as
/// overflowed; the session owning it treats that as a close.
#[derive(Debug, Clone)]
pub struct ClientSender {
    tx: mpsc::Sender<String>,
    overflow: Arc<Notify>,
}

impl ClientSender {
    /// Creates a queue holding at most `capacity` pending frames.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sender = Self {
            tx,
            overflow: Arc::new(Notify::new()),
        };
        (sender, rx)
    }

    /// Signalled once the queue has overflowed.
    pub fn overflow_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.overflow)
    }
}

impl FrameSink for ClientSender {
    fn send_frame(&self, frame: String) -> Result<(), SinkClosed> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.overflow.notify_one();
                Err(SinkClosed)
            }
            Err(TrySendError::Closed(_)) => Err(SinkClosed),
        }
    }
}

/// A live connection: its id plus the way to reach it.
#[derive(Debug, Clone)]
pub struct Connection<S> {
    id: ConnectionId,
    sink: S,
}

impl<S: FrameSink> Connection<S> {
    pub fn new(id: ConnectionId, sink: S) -> Self {
        Self { id, sink }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queues one frame for delivery.
    pub fn send(&self, frame: String) -> Result<(), SinkClosed> {
        self.sink.send_frame(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_client_sender_delivers() {
        let (tx, mut rx) = ClientSender::channel(4);
        let conn = Connection::new(ConnectionId::new(1), tx);

        conn.send("hello".to_string()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "hello");

        drop(rx);
        assert_eq!(conn.send("lost".to_string()), Err(SinkClosed));
    }

    #[tokio::test]
    async fn test_full_queue_signals_overflow() {
        let (tx, mut rx) = ClientSender::channel(2);
        let overflow = tx.overflow_signal();

        assert!(tx.send_frame("a".to_string()).is_ok());
        assert!(tx.send_frame("b".to_string()).is_ok());
        assert_eq!(tx.send_frame("c".to_string()), Err(SinkClosed));

        tokio::time::timeout(Duration::from_secs(1), overflow.notified())
            .await
            .expect("overflow was not signalled");

        // Frames already queued are untouched
        assert_eq!(rx.try_recv().unwrap(), "a");
        assert_eq!(rx.try_recv().unwrap(), "b");
    }

    #[test]
    fn test_connection_id_display() {
        assert_eq!(ConnectionId::new(7).to_string(), "conn-7");
        assert_eq!(ConnectionId::new(7).get(), 7);
    }
}
