//! Listener setup and task wiring.

use crate::config::LoadedConfig;
use crate::intake::{run_client_listener, run_event_listener};
use followermaze_core::events::event_intake_channel;
use followermaze_core::fanout::FanOut;
use followermaze_core::processors::SequencingEngine;
use followermaze_core::registry::ClientRegistry;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Both listeners, bound and ready to accept.
pub struct Server {
    event_listener: TcpListener,
    client_listener: TcpListener,
    registry: ClientRegistry,
    config: LoadedConfig,
}

impl Server {
    /// Bind the event and client listeners.
    pub async fn bind(config: LoadedConfig) -> std::io::Result<Self> {
        let event_listener = TcpListener::bind(config.server.event_listen).await?;
        let client_listener = TcpListener::bind(config.server.client_listen).await?;
        Ok(Self {
            event_listener,
            client_listener,
            registry: ClientRegistry::new(),
            config,
        })
    }

    pub fn event_addr(&self) -> std::io::Result<SocketAddr> {
        self.event_listener.local_addr()
    }

    pub fn client_addr(&self) -> std::io::Result<SocketAddr> {
        self.client_listener.local_addr()
    }

    #[cfg(test)]
    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Run the sequencing engine and both listeners until shutdown.
    pub async fn run(self, shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<()> {
        let Server {
            event_listener,
            client_listener,
            registry,
            config,
        } = self;

        let (intake_tx, intake_rx) = event_intake_channel(config.sequencer.intake_buffer);
        let fanout = FanOut::new(registry.clone(), config.server.line_terminator);
        let engine = SequencingEngine::new(fanout, intake_rx, shutdown_rx.clone())
            .with_stall_report_interval(config.sequencer.stall_report_interval);

        let engine_task = tokio::spawn(engine.run());
        let event_task = tokio::spawn(run_event_listener(
            event_listener,
            intake_tx,
            shutdown_rx.clone(),
        ));
        let client_task = tokio::spawn(run_client_listener(
            client_listener,
            registry.clone(),
            config.server.max_client_id_bytes,
            shutdown_rx,
        ));

        let (events, clients, engine) = tokio::join!(event_task, client_task, engine_task);
        events?;
        clients?;
        engine?;

        let remaining = registry.snapshot().await;
        tracing::info!(clients = remaining.len(), "Closing client connections");
        for connection in remaining {
            registry.unregister_connection(&connection).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::runtime::{LoggingConfig, SequencerConfig, ServerConfig};
    use followermaze_core::events::UserId;
    use followermaze_core::registry::ConnectionId;
    use followermaze_sdk::LineTerminator;
    use followermaze_sdk::client::{EventSourceClient, SdkError, UserClient};
    use std::time::Duration;
    use tokio::task::JoinHandle;
    use tokio::time::Instant;

    const WAIT: Duration = Duration::from_secs(5);

    struct Running {
        event_addr: SocketAddr,
        client_addr: SocketAddr,
        registry: ClientRegistry,
        shutdown_tx: watch::Sender<bool>,
        task: JoinHandle<anyhow::Result<()>>,
    }

    fn test_config() -> LoadedConfig {
        let localhost: SocketAddr = "127.0.0.1:0".parse().unwrap();
        LoadedConfig {
            server: ServerConfig {
                event_listen: localhost,
                client_listen: localhost,
                line_terminator: LineTerminator::Lf,
                max_client_id_bytes: 16,
            },
            sequencer: SequencerConfig {
                intake_buffer: 64,
                stall_report_interval: Duration::from_secs(1),
            },
            logging: LoggingConfig {
                filter: "info".to_string(),
                json: false,
            },
        }
    }

    async fn start() -> Running {
        let server = Server::bind(test_config()).await.unwrap();
        let event_addr = server.event_addr().unwrap();
        let client_addr = server.client_addr().unwrap();
        let registry = server.registry().clone();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(server.run(shutdown_rx));
        Running {
            event_addr,
            client_addr,
            registry,
            shutdown_tx,
            task,
        }
    }

    impl Running {
        /// Connect `user_id` and wait until the server has registered it.
        async fn connect(&self, user_id: UserId) -> UserClient {
            let client = UserClient::connect(self.client_addr, user_id).await.unwrap();
            self.wait_registered(user_id, None).await;
            client
        }

        /// Wait until `user_id` has a registered connection other than
        /// `replacing`.
        async fn wait_registered(&self, user_id: UserId, replacing: Option<ConnectionId>) {
            let deadline = Instant::now() + WAIT;
            loop {
                let current = self.registry.client_by_id(user_id).await;
                if current.is_some_and(|c| Some(c.id()) != replacing) {
                    return;
                }
                assert!(Instant::now() < deadline, "user {user_id} never registered");
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }

        async fn wait_empty(&self) {
            let deadline = Instant::now() + WAIT;
            while !self.registry.is_empty().await {
                assert!(Instant::now() < deadline, "registry never emptied");
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        }

        async fn send(&self, lines: &[&str]) {
            let mut source = EventSourceClient::connect(self.event_addr).await.unwrap();
            source.send_all(lines).await.unwrap();
            source.finish().await.unwrap();
        }

        async fn stop(self) {
            self.shutdown_tx.send(true).unwrap();
            tokio::time::timeout(WAIT, self.task)
                .await
                .unwrap()
                .unwrap()
                .unwrap();
        }
    }

    async fn next(client: &mut UserClient) -> String {
        client.next_line_timeout(WAIT).await.unwrap().unwrap()
    }

    async fn assert_silent(client: &mut UserClient) {
        let got = client.next_line_timeout(Duration::from_millis(200)).await;
        assert!(matches!(got, Err(SdkError::Timeout(_))), "unexpected {got:?}");
    }

    #[tokio::test]
    async fn test_follow_and_status_update() {
        let server = start().await;
        let mut client1 = server.connect(1).await;
        let mut client2 = server.connect(2).await;

        server.send(&["2|F|2|1", "1|F|1|2"]).await;
        assert_eq!(next(&mut client1).await, "2|F|2|1");
        assert_eq!(next(&mut client2).await, "1|F|1|2");

        server.send(&["3|S|1"]).await;
        assert_eq!(next(&mut client2).await, "3|S|1");
        assert_silent(&mut client1).await;

        server.stop().await;
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_client() {
        let server = start().await;
        let mut clients = Vec::new();
        for user_id in 1..=5 {
            clients.push(server.connect(user_id).await);
        }

        server.send(&["2|B", "1|B"]).await;
        for client in &mut clients {
            assert_eq!(next(client).await, "1|B");
            assert_eq!(next(client).await, "2|B");
        }

        server.stop().await;
    }

    #[tokio::test]
    async fn test_malformed_line_does_not_block() {
        let server = start().await;
        let mut client = server.connect(1).await;

        server
            .send(&["1|B", "2|B", "3|B", "4|B", "5|B", "not-an-event", "6|B"])
            .await;
        for n in 1..=6 {
            assert_eq!(next(&mut client).await, format!("{n}|B"));
        }

        server.stop().await;
    }

    #[tokio::test]
    async fn test_private_message_only_reaches_recipient() {
        let server = start().await;
        let mut alice = server.connect(10).await;
        let mut bob = server.connect(20).await;

        server.send(&["1|P|10|20", "2|P|20|99", "3|P|20|10"]).await;
        assert_eq!(next(&mut bob).await, "1|P|10|20");
        assert_eq!(next(&mut alice).await, "3|P|20|10");
        assert_silent(&mut bob).await;

        server.stop().await;
    }

    #[tokio::test]
    async fn test_events_split_across_source_connections() {
        let server = start().await;
        let mut client = server.connect(3).await;

        server.send(&["3|B", "2|B"]).await;
        assert_silent(&mut client).await;

        server.send(&["1|B"]).await;
        for n in 1..=3 {
            assert_eq!(next(&mut client).await, format!("{n}|B"));
        }

        server.stop().await;
    }

    #[tokio::test]
    async fn test_invalid_id_is_rejected() {
        let server = start().await;
        let mut client = UserClient::connect_raw(server.client_addr, "abc", 0)
            .await
            .unwrap();

        let got = client.next_line_timeout(WAIT).await;
        assert!(matches!(got, Ok(None) | Err(SdkError::Io(_))), "unexpected {got:?}");
        assert!(server.registry.is_empty().await);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_disconnect_unregisters_client() {
        let server = start().await;
        let client = server.connect(4).await;
        assert_eq!(server.registry.len().await, 1);

        drop(client);
        server.wait_empty().await;

        server.stop().await;
    }

    #[tokio::test]
    async fn test_reregistration_replaces_connection() {
        let server = start().await;
        let mut first = server.connect(7).await;
        let first_id = server.registry.client_by_id(7).await.unwrap().id();

        let mut second = UserClient::connect(server.client_addr, 7).await.unwrap();
        server.wait_registered(7, Some(first_id)).await;

        let got = first.next_line_timeout(WAIT).await;
        assert!(matches!(got, Ok(None) | Err(SdkError::Io(_))), "unexpected {got:?}");

        server.send(&["1|B"]).await;
        assert_eq!(next(&mut second).await, "1|B");

        server.stop().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_clients() {
        let server = start().await;
        let mut client = server.connect(1).await;
        server.stop().await;

        let got = client.next_line_timeout(WAIT).await;
        assert!(matches!(got, Ok(None) | Err(SdkError::Io(_))), "unexpected {got:?}");
    }
}
