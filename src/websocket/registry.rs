//! Live connection registry.
//!
//! Maps each user to at most one connection handle. Registering again
//! replaces the previous handle, and removal only takes effect if the
//! caller still owns the registered connection, so a slow disconnect
//! cannot evict its replacement.

use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::protocol::ServerFrame;

/// Handle to one live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Identity of this particular connection, used to guard removal.
    pub conn_id: Uuid,
    /// Queue into the session's writer half. Frames sent here are
    /// serialized onto the socket by the owning session task.
    pub tx: mpsc::UnboundedSender<ServerFrame>,
}

impl ConnectionHandle {
    pub fn new(conn_id: Uuid, tx: mpsc::UnboundedSender<ServerFrame>) -> Self {
        Self { conn_id, tx }
    }
}

/// Concurrent user → connection map shared by all sessions.
///
/// Handles are cloned out of the map so frame sends never happen while
/// the lock is held.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<Uuid, ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user's connection, replacing any previous one.
    pub async fn register(&self, user_id: Uuid, handle: ConnectionHandle) {
        let mut connections = self.connections.write().await;
        if let Some(old) = connections.insert(user_id, handle) {
            debug!(%user_id, replaced = %old.conn_id, "connection replaced");
        }
    }

    /// The user's live connection, if any.
    pub async fn lookup(&self, user_id: Uuid) -> Option<ConnectionHandle> {
        self.connections.read().await.get(&user_id).cloned()
    }

    /// Remove the user's connection, but only if it is still the one
    /// identified by `conn_id`.
    pub async fn remove(&self, user_id: Uuid, conn_id: Uuid) {
        let mut connections = self.connections.write().await;
        if connections
            .get(&user_id)
            .is_some_and(|h| h.conn_id == conn_id)
        {
            connections.remove(&user_id);
        }
    }

    /// Number of live connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> (ConnectionHandle, mpsc::UnboundedReceiver<ServerFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(Uuid::new_v4(), tx), rx)
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (h, _rx) = handle();

        registry.register(user, h.clone()).await;
        let found = registry.lookup(user).await.unwrap();
        assert_eq!(found.conn_id, h.conn_id);
        assert_eq!(registry.connection_count().await, 1);

        assert!(registry.lookup(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_register_replaces_previous_connection() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (h1, _rx1) = handle();
        let (h2, _rx2) = handle();

        registry.register(user, h1).await;
        registry.register(user, h2.clone()).await;

        assert_eq!(registry.connection_count().await, 1);
        assert_eq!(registry.lookup(user).await.unwrap().conn_id, h2.conn_id);
    }

    #[tokio::test]
    async fn test_stale_remove_keeps_newer_connection() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (h1, _rx1) = handle();
        let (h2, _rx2) = handle();

        registry.register(user, h1.clone()).await;
        registry.register(user, h2.clone()).await;

        // The first session cleans up late; its handle is stale by now.
        registry.remove(user, h1.conn_id).await;
        assert_eq!(registry.lookup(user).await.unwrap().conn_id, h2.conn_id);

        // The owning session's removal does take effect.
        registry.remove(user, h2.conn_id).await;
        assert!(registry.lookup(user).await.is_none());
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_handles_deliver_to_owning_session() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        let (h, mut rx) = handle();
        registry.register(user, h).await;

        let found = registry.lookup(user).await.unwrap();
        found.tx.send(ServerFrame::Connect { user_id: user }).unwrap();

        match rx.recv().await.unwrap() {
            ServerFrame::Connect { user_id } => assert_eq!(user_id, user),
            other => panic!("expected connect ack, got {:?}", other),
        }
    }
}
