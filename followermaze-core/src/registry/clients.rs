//! Registry of connected clients.
//!
//! Unlike the follower graph, the registry is shared: client intake tasks
//! register and unregister connections concurrently, delivery workers
//! unregister connections whose writes fail, and fan-out looks clients up
//! while processing events. It therefore sits behind `Arc<RwLock<_>>`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, RwLock, watch};
use tracing::info;

use crate::events::UserId;
use crate::notify::{Transport, TransportError};

/// Process-unique identifier of one accepted client connection.
pub type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// One registered client connection: the user it belongs to, the transport
/// used to reach it, and a closed flag.
///
/// Closing only raises the flag. The transport itself is shut down by the
/// connection's delivery worker once its in-flight write finishes, or
/// dropped with the last reference to the connection.
pub struct ClientConnection {
    user_id: UserId,
    id: ConnectionId,
    transport: Mutex<Box<dyn Transport>>,
    closed: watch::Sender<bool>,
}

impl ClientConnection {
    pub fn new(user_id: UserId, transport: impl Transport) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            user_id,
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            transport: Mutex::new(Box::new(transport)),
            closed,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Write `payload` to the client.
    pub async fn send(&self, payload: &[u8]) -> Result<usize, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.transport.lock().await.send(payload).await
    }

    /// Mark the connection closed. Returns `true` if this call closed it.
    pub fn close(&self) -> bool {
        !self.closed.send_replace(true)
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the connection has been closed.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Shut the underlying transport down, waiting for any in-flight write.
    pub(crate) async fn shutdown_transport(&self) {
        self.transport.lock().await.close().await;
    }
}

impl fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConnection")
            .field("user_id", &self.user_id)
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// `user id -> connection`, last registration wins.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<UserId, Arc<ClientConnection>>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `transport` as the connection of `user_id`.
    ///
    /// A connection previously registered under the same id is replaced
    /// and closed.
    pub async fn register_client(
        &self,
        user_id: UserId,
        transport: impl Transport,
    ) -> Arc<ClientConnection> {
        let connection = Arc::new(ClientConnection::new(user_id, transport));
        let displaced = self
            .clients
            .write()
            .await
            .insert(user_id, Arc::clone(&connection));

        match displaced {
            Some(previous) => {
                previous.close();
                info!(
                    user_id,
                    connection_id = connection.id(),
                    previous_connection_id = previous.id(),
                    "Client re-registered, closed previous connection"
                );
            }
            None => {
                info!(user_id, connection_id = connection.id(), "Registered client");
            }
        }
        connection
    }

    /// Remove and close whatever connection `user_id` currently has.
    pub async fn unregister_client(&self, user_id: UserId) -> Option<Arc<ClientConnection>> {
        let removed = self.clients.write().await.remove(&user_id);
        if let Some(connection) = &removed {
            connection.close();
            info!(user_id, connection_id = connection.id(), "Unregistered client");
        }
        removed
    }

    /// Close `connection` and remove it from the registry, unless its user
    /// has since registered a newer connection. Returns whether an entry
    /// was removed.
    pub async fn unregister_connection(&self, connection: &ClientConnection) -> bool {
        let user_id = connection.user_id();
        let removed = {
            let mut clients = self.clients.write().await;
            let is_current = clients
                .get(&user_id)
                .is_some_and(|current| current.id() == connection.id());
            if is_current {
                clients.remove(&user_id);
            }
            is_current
        };

        connection.close();
        if removed {
            info!(user_id, connection_id = connection.id(), "Unregistered client");
        }
        removed
    }

    pub async fn client_by_id(&self, user_id: UserId) -> Option<Arc<ClientConnection>> {
        self.clients.read().await.get(&user_id).cloned()
    }

    /// Every registered connection at this instant.
    pub async fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.clients.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}
