//! Per-client ordered delivery.
//!
//! Every client connection that has been sent at least one notification has
//! exactly one [`DeliveryWorker`] task and one unbounded channel feeding it.
//! The hub that owns the sending halves lives inside fan-out, so enqueueing
//! happens in sequence order and a channel send never waits on a socket.
//!
//! A channel is bound to a single connection, not to a user id. When a user
//! registers again, the next enqueue notices the connection id changed and
//! starts a fresh worker for the new connection. The old worker stops as
//! soon as it sees its connection closed, so no payload is ever written to
//! a connection it was not addressed to.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::events::{NotificationReceiver, NotificationSender, UserId, notification_channel};
use crate::registry::{ClientConnection, ClientRegistry, ConnectionId};

struct NotificationChannel {
    connection_id: ConnectionId,
    tx: NotificationSender,
}

impl NotificationChannel {
    fn is_live_for(&self, connection: &ClientConnection) -> bool {
        self.connection_id == connection.id() && !connection.is_closed() && !self.tx.is_closed()
    }
}

/// Owner of every client's notification queue.
pub struct NotificationHub {
    registry: ClientRegistry,
    channels: HashMap<UserId, NotificationChannel>,
}

impl NotificationHub {
    pub fn new(registry: ClientRegistry) -> Self {
        Self {
            registry,
            channels: HashMap::new(),
        }
    }

    /// Queue `payload` for `connection`, starting its worker on first use.
    ///
    /// Returns `false` if the payload was dropped because the connection's
    /// worker has already stopped.
    pub fn enqueue(&mut self, connection: &Arc<ClientConnection>, payload: Bytes) -> bool {
        let user_id = connection.user_id();

        let live = self
            .channels
            .get(&user_id)
            .is_some_and(|channel| channel.is_live_for(connection));
        if !live {
            if connection.is_closed() {
                trace!(user_id, "Not enqueueing for closed connection");
                self.channels.remove(&user_id);
                return false;
            }
            let channel = self.spawn_worker(connection);
            self.channels.insert(user_id, channel);
        }

        let Some(channel) = self.channels.get(&user_id) else {
            return false;
        };
        if channel.tx.send(payload).is_err() {
            debug!(
                user_id,
                connection_id = connection.id(),
                "Delivery worker gone, dropping notification"
            );
            self.channels.remove(&user_id);
            return false;
        }
        true
    }

    /// Forget channels whose worker has exited. Returns how many were
    /// removed.
    pub fn prune(&mut self) -> usize {
        let before = self.channels.len();
        self.channels.retain(|_, channel| !channel.tx.is_closed());
        before - self.channels.len()
    }

    /// Number of channels currently held.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn spawn_worker(&self, connection: &Arc<ClientConnection>) -> NotificationChannel {
        let (tx, rx) = notification_channel();
        let worker = DeliveryWorker {
            connection: Arc::clone(connection),
            rx,
            registry: self.registry.clone(),
        };
        tokio::spawn(worker.run());

        NotificationChannel {
            connection_id: connection.id(),
            tx,
        }
    }
}

/// Drains one connection's queue into its transport.
struct DeliveryWorker {
    connection: Arc<ClientConnection>,
    rx: NotificationReceiver,
    registry: ClientRegistry,
}

impl DeliveryWorker {
    async fn run(mut self) {
        let user_id = self.connection.user_id();
        let connection_id = self.connection.id();
        debug!(user_id, connection_id, "Delivery worker started");

        loop {
            tokio::select! {
                biased;

                _ = self.connection.closed() => {
                    debug!(user_id, connection_id, "Connection closed, stopping delivery");
                    break;
                }

                payload = self.rx.recv() => {
                    let Some(payload) = payload else {
                        debug!(user_id, connection_id, "Notification channel closed");
                        break;
                    };

                    if let Err(e) = self.connection.send(&payload).await {
                        warn!(
                            user_id,
                            connection_id,
                            error = %e,
                            "Failed to notify client, dropping connection"
                        );
                        self.registry.unregister_connection(&self.connection).await;
                        break;
                    }
                    trace!(user_id, bytes = payload.len(), "Notified client");
                }
            }
        }

        // Anything still queued is discarded with the receiver.
        self.rx.close();
        self.connection.shutdown_transport().await;
        debug!(user_id, connection_id, "Delivery worker stopped");
    }
}
