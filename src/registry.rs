//! Connection registry: which live connections have joined, and as whom.
//!
//! The registry is plain data. Synchronization is the owner's job; see
//! [`crate::relay::Relay`], which keeps it behind a single mutex.

use std::collections::{BTreeMap, HashMap};

use crate::connection::{Connection, ConnectionId, FrameSink};

/// Server-held identity of a joined connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceRecord {
    pub username: String,
}

#[derive(Debug)]
struct Entry<S> {
    connection: Connection<S>,
    record: PresenceRecord,
    /// Position in the roster. Assigned on first join only.
    seq: u64,
}

/// Maps joined connections to their presence records, in join order.
#[derive(Debug)]
pub struct Registry<S> {
    entries: HashMap<ConnectionId, Entry<S>>,
    order: BTreeMap<u64, ConnectionId>,
    next_seq: u64,
}

impl<S> Default for Registry<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<S: FrameSink> Registry<S> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites the record for `connection`.
    ///
    /// A repeated join on the same connection replaces the username but
    /// keeps its roster position. Returns the replaced record, if any.
    /// The username is not validated.
    pub fn register(
        &mut self,
        connection: Connection<S>,
        username: impl Into<String>,
    ) -> Option<PresenceRecord> {
        let record = PresenceRecord {
            username: username.into(),
        };

        if let Some(entry) = self.entries.get_mut(&connection.id()) {
            entry.connection = connection;
            return Some(std::mem::replace(&mut entry.record, record));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, connection.id());
        self.entries.insert(
            connection.id(),
            Entry {
                connection,
                record,
                seq,
            },
        );
        None
    }

    /// Resolves a connection to its presence record.
    pub fn lookup(&self, id: ConnectionId) -> Option<&PresenceRecord> {
        self.entries.get(&id).map(|e| &e.record)
    }

    /// Removes and returns the record. Unknown ids are a no-op.
    pub fn remove(&mut self, id: ConnectionId) -> Option<PresenceRecord> {
        let entry = self.entries.remove(&id)?;
        self.order.remove(&entry.seq);
        Some(entry.record)
    }

    /// Usernames of all registered connections, in join order.
    pub fn snapshot(&self) -> Vec<String> {
        self.records().map(|r| r.username.clone()).collect()
    }

    /// Registered connections, in join order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection<S>> + '_ {
        self.ordered().map(|e| &e.connection)
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn records(&self) -> impl Iterator<Item = &PresenceRecord> + '_ {
        self.ordered().map(|e| &e.record)
    }

    fn ordered(&self) -> impl Iterator<Item = &Entry<S>> + '_ {
        self.order.values().filter_map(|id| self.entries.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ClientSender;

    fn conn(id: u64) -> Connection<ClientSender> {
        let (tx, _rx) = ClientSender::channel(8);
        Connection::new(ConnectionId::new(id), tx)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());

        assert_eq!(registry.register(conn(1), "alice"), None);

        let record = registry.lookup(ConnectionId::new(1)).unwrap();
        assert_eq!(record.username, "alice");
        assert_eq!(registry.snapshot(), vec!["alice"]);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(ConnectionId::new(1)));
        assert!(registry.lookup(ConnectionId::new(2)).is_none());
    }

    #[test]
    fn test_snapshot_preserves_join_order() {
        let mut registry = Registry::new();
        // Connection ids deliberately out of order relative to joins
        registry.register(conn(3), "carol");
        registry.register(conn(1), "alice");
        registry.register(conn(2), "bob");

        assert_eq!(registry.snapshot(), vec!["carol", "alice", "bob"]);

        let ids: Vec<u64> = registry.connections().map(|c| c.id().get()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_reregister_overwrites_in_place() {
        let mut registry = Registry::new();
        registry.register(conn(1), "alice");
        registry.register(conn(2), "bob");

        let previous = registry.register(conn(1), "alicia");
        assert_eq!(
            previous,
            Some(PresenceRecord {
                username: "alice".to_string()
            })
        );
        assert_eq!(registry.snapshot(), vec!["alicia", "bob"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_and_empty_names_accepted() {
        let mut registry = Registry::new();
        registry.register(conn(1), "sam");
        registry.register(conn(2), "sam");
        registry.register(conn(3), "");

        assert_eq!(registry.snapshot(), vec!["sam", "sam", ""]);
    }

    #[test]
    fn test_remove() {
        let mut registry = Registry::new();
        registry.register(conn(1), "alice");
        registry.register(conn(2), "bob");

        let removed = registry.remove(ConnectionId::new(1)).unwrap();
        assert_eq!(removed.username, "alice");
        assert_eq!(registry.snapshot(), vec!["bob"]);

        // Second removal and unknown ids are no-ops
        assert!(registry.remove(ConnectionId::new(1)).is_none());
        assert!(registry.remove(ConnectionId::new(99)).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_rejoin_after_remove_goes_to_back() {
        let mut registry = Registry::new();
        registry.register(conn(1), "alice");
        registry.register(conn(2), "bob");
        registry.remove(ConnectionId::new(1));
        registry.register(conn(1), "alice");

        assert_eq!(registry.snapshot(), vec!["bob", "alice"]);
    }
}
