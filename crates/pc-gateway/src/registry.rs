//! Connection registry
//!
//! Maps each open client connection to its live bridge session. The map is
//! a `DashMap`, so lookups run concurrently while inserts and removals take
//! the owning shard's write lock.
//!
//! # Invariants
//!
//! - A connection maps to at most one session at any instant.
//! - Teardown removes an entry only if it still holds the session being torn
//!   down ([`ConnectionRegistry::remove_if_same`]), so a late teardown can
//!   never evict a newer session on the same connection.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use pc_core::{ConnectionId, SessionId};

/// Registry of live sessions keyed by client connection
pub struct ConnectionRegistry<S> {
    /// Sessions indexed by owning connection
    entries: DashMap<ConnectionId, Arc<S>>,
}

impl<S> ConnectionRegistry<S> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Register `session` for `connection`, returning any entry it replaced
    pub fn put(&self, connection: ConnectionId, session: Arc<S>) -> Option<Arc<S>> {
        self.entries.insert(connection, session)
    }

    /// Get the session for a connection
    pub fn get(&self, connection: ConnectionId) -> Option<Arc<S>> {
        self.entries.get(&connection).map(|r| Arc::clone(&r))
    }

    /// Remove and return the session for a connection
    pub fn remove(&self, connection: ConnectionId) -> Option<Arc<S>> {
        self.entries.remove(&connection).map(|(_, session)| session)
    }

    /// Remove the entry for `connection` only if it is `session`.
    ///
    /// Returns whether an entry was removed.
    pub fn remove_if_same(&self, connection: ConnectionId, session: &Arc<S>) -> bool {
        self.entries
            .remove_if(&connection, |_, current| Arc::ptr_eq(current, session))
            .is_some()
    }

    /// Whether a connection currently has a session
    pub fn contains(&self, connection: ConnectionId) -> bool {
        self.entries.contains_key(&connection)
    }

    /// Remove every entry, returning the sessions
    pub fn drain(&self) -> Vec<Arc<S>> {
        let connections: Vec<ConnectionId> = self.entries.iter().map(|r| *r.key()).collect();
        connections
            .into_iter()
            .filter_map(|connection| self.remove(connection))
            .collect()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S> Default for ConnectionRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Allocates process-unique connection and session identifiers
pub struct IdAllocator {
    next_connection_id: AtomicU64,
    next_session_id: AtomicU32,
}

impl IdAllocator {
    /// Create a new allocator
    pub fn new() -> Self {
        Self {
            next_connection_id: AtomicU64::new(1),
            next_session_id: AtomicU32::new(1),
        }
    }

    /// Allocate a new connection ID
    pub fn next_connection(&self) -> ConnectionId {
        ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Allocate a new session ID
    pub fn next_session(&self) -> SessionId {
        SessionId::new(self.next_session_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
