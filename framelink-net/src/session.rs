//! Sessions and the session registry.

use crate::connection::Connection;
use crate::error::NetError;
use bytes::Bytes;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// A stream connection plus its stable identifier.
///
/// Created on accept, retained in the server's registry for the life of the
/// connection, removed on close.
pub struct Session {
    /// Unique session ID (version-4 UUID string).
    id: String,
    connection: Connection,
    remote_addr: SocketAddr,
    created_at: Instant,
}

impl Session {
    pub fn new(connection: Connection) -> Self {
        let remote_addr = connection.peer_addr();
        Self {
            id: Uuid::new_v4().to_string(),
            connection,
            remote_addr,
            created_at: Instant::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Enqueues a frame on this session's connection.
    pub fn write(&self, payload: impl Into<Bytes>) -> Result<(), NetError> {
        self.connection.write(payload)
    }

    /// Closes the underlying connection. Idempotent.
    pub fn close(&self) {
        self.connection.close();
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    /// Time since the session was accepted.
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("remote_addr", &self.remote_addr)
            .finish()
    }
}

/// Sessions keyed by identifier.
///
/// Inserts and removals happen on accept and disconnect; broadcast iterates
/// a snapshot so one session's failure never affects the others.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Arc<Session>) {
        self.sessions.insert(session.id().to_owned(), session);
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.remove(id).map(|(_, session)| session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|entry| entry.clone())
    }

    /// A point-in-time copy of every registered session.
    pub fn snapshot(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|entry| entry.clone()).collect()
    }

    /// Closes and drops every session.
    pub fn drain(&self) {
        for session in self.snapshot() {
            session.close();
        }
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
