//! Per event kind: who gets notified, and what happens to the graph.
//!
//! | Kind           | Graph                       | Notified                     |
//! |----------------|-----------------------------|------------------------------|
//! | Follow         | `to` gains follower `from`  | `to`                         |
//! | Unfollow       | `to` loses follower `from`  | nobody                       |
//! | Broadcast      | -                           | every registered client      |
//! | PrivateMessage | -                           | `to`                         |
//! | StatusUpdate   | -                           | every follower of `from`     |
//!
//! Recipients that are not connected are skipped silently.

use async_trait::async_trait;
use bytes::Bytes;
use followermaze_sdk::LineTerminator;
use tracing::{debug, trace};

use crate::events::{Event, EventKind, UserId};
use crate::notify::NotificationHub;
use crate::registry::{ClientRegistry, FollowerGraph};
use crate::sequencing::EventProcessor;

/// Applies released events to the follower graph and the clients.
pub struct FanOut {
    graph: FollowerGraph,
    registry: ClientRegistry,
    hub: NotificationHub,
    terminator: LineTerminator,
}

impl FanOut {
    pub fn new(registry: ClientRegistry, terminator: LineTerminator) -> Self {
        Self {
            graph: FollowerGraph::new(),
            hub: NotificationHub::new(registry.clone()),
            registry,
            terminator,
        }
    }

    pub fn graph(&self) -> &FollowerGraph {
        &self.graph
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    /// Queue `payload` for `user_id` if that user is connected.
    async fn notify(&mut self, user_id: UserId, payload: &Bytes) -> bool {
        match self.registry.client_by_id(user_id).await {
            Some(connection) => self.hub.enqueue(&connection, payload.clone()),
            None => {
                trace!(user_id, "Recipient not connected, dropping notification");
                false
            }
        }
    }

    async fn broadcast(&mut self, payload: &Bytes) -> usize {
        let mut delivered = 0;
        for connection in self.registry.snapshot().await {
            if self.hub.enqueue(&connection, payload.clone()) {
                delivered += 1;
            }
        }
        delivered
    }
}

#[async_trait]
impl EventProcessor for FanOut {
    async fn process_event(&mut self, event: Event) {
        let payload = self.terminator.frame(event.payload());

        let notified = match event.kind() {
            EventKind::Follow { from, to } => {
                self.graph.add_follower(to, from);
                usize::from(self.notify(to, &payload).await)
            }
            EventKind::Unfollow { from, to } => {
                self.graph.remove_follower(to, from);
                0
            }
            EventKind::Broadcast => self.broadcast(&payload).await,
            EventKind::PrivateMessage { to, .. } => usize::from(self.notify(to, &payload).await),
            EventKind::StatusUpdate { from } => {
                let followers: Vec<UserId> = self.graph.followers_of(from).collect();
                let mut notified = 0;
                for follower in followers {
                    if self.notify(follower, &payload).await {
                        notified += 1;
                    }
                }
                notified
            }
        };

        debug!(
            sequence = event.sequence(),
            kind = %event.kind(),
            notified,
            "Processed event"
        );
    }

    fn housekeeping(&mut self) {
        let pruned = self.hub.prune();
        if pruned > 0 {
            debug!(pruned, "Pruned stopped delivery workers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::parse;
    use crate::notify::SocketTransport;
    use crate::testing::{Peer, duplex_transport};
    use tokio::io::AsyncReadExt;

    async fn connect(registry: &ClientRegistry, user_id: UserId) -> Peer {
        let (transport, peer) = duplex_transport();
        registry.register_client(user_id, transport).await;
        peer
    }

    async fn process(fanout: &mut FanOut, lines: &[&str]) {
        for line in lines {
            fanout.process_event(parse(line).unwrap()).await;
        }
    }

    fn fanout(registry: &ClientRegistry) -> FanOut {
        FanOut::new(registry.clone(), LineTerminator::Lf)
    }

    #[tokio::test]
    async fn test_follow_and_status_update() {
        let registry = ClientRegistry::new();
        let mut fanout = fanout(&registry);
        let mut client1 = connect(&registry, 1).await;
        let mut client2 = connect(&registry, 2).await;

        process(&mut fanout, &["1|F|1|2", "2|F|2|1"]).await;
        assert_eq!(client1.next_line().await.unwrap(), "2|F|2|1");
        assert_eq!(client2.next_line().await.unwrap(), "1|F|1|2");

        process(&mut fanout, &["3|S|1"]).await;
        assert_eq!(client2.next_line().await.unwrap(), "3|S|1");
        client1.assert_silent().await;
    }

    #[tokio::test]
    async fn test_unfollow_stops_status_updates() {
        let registry = ClientRegistry::new();
        let mut fanout = fanout(&registry);
        let mut follower = connect(&registry, 2).await;
        let mut followed = connect(&registry, 1).await;

        process(&mut fanout, &["1|F|2|1", "2|S|1", "3|U|2|1", "4|S|1"]).await;

        assert_eq!(followed.next_line().await.unwrap(), "1|F|2|1");
        followed.assert_silent().await;
        assert_eq!(follower.next_line().await.unwrap(), "2|S|1");
        follower.assert_silent().await;
        assert_eq!(fanout.graph().follower_count(1), 0);
        assert_eq!(fanout.graph().followed_count(), 0);
    }

    #[tokio::test]
    async fn test_repeated_follow_does_not_duplicate_updates() {
        let registry = ClientRegistry::new();
        let mut fanout = fanout(&registry);
        let mut follower = connect(&registry, 2).await;

        process(&mut fanout, &["1|F|2|1", "2|F|2|1", "3|S|1"]).await;
        assert_eq!(fanout.graph().follower_count(1), 1);
        assert_eq!(follower.next_line().await.unwrap(), "3|S|1");
        follower.assert_silent().await;
    }

    #[tokio::test]
    async fn test_broadcast_reaches_everyone_in_order() {
        let registry = ClientRegistry::new();
        let mut fanout = fanout(&registry);
        let mut peers = Vec::new();
        for user_id in 1..=10 {
            peers.push(connect(&registry, user_id).await);
        }

        process(&mut fanout, &["1|B", "2|B"]).await;
        for peer in &mut peers {
            assert_eq!(peer.next_line().await.unwrap(), "1|B");
            assert_eq!(peer.next_line().await.unwrap(), "2|B");
        }
    }

    #[tokio::test]
    async fn test_private_message_only_reaches_recipient() {
        let registry = ClientRegistry::new();
        let mut fanout = fanout(&registry);
        let mut sender = connect(&registry, 1).await;
        let mut recipient = connect(&registry, 2).await;

        process(&mut fanout, &["1|P|1|2", "2|P|1|3"]).await;
        assert_eq!(recipient.next_line().await.unwrap(), "1|P|1|2");
        recipient.assert_silent().await;
        sender.assert_silent().await;
    }

    #[tokio::test]
    async fn test_follow_of_disconnected_user_still_updates_graph() {
        let registry = ClientRegistry::new();
        let mut fanout = fanout(&registry);

        process(&mut fanout, &["1|F|2|1"]).await;
        assert!(fanout.graph().is_following(1, 2));

        // The follower connects later and still gets the followed user's
        // status updates.
        let mut follower = connect(&registry, 2).await;
        process(&mut fanout, &["2|S|1"]).await;
        assert_eq!(follower.next_line().await.unwrap(), "2|S|1");
    }

    #[tokio::test]
    async fn test_crlf_terminator() {
        let registry = ClientRegistry::new();
        let mut fanout = FanOut::new(registry.clone(), LineTerminator::Crlf);
        let (server_side, mut client_side) = tokio::io::duplex(1024);
        registry
            .register_client(1, SocketTransport::new(server_side))
            .await;

        process(&mut fanout, &["1|B"]).await;

        let mut buf = [0u8; 5];
        client_side.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"1|B\r\n");
    }
}
