//! MQTT broker session.
//!
//! [`BrokerSession`] owns the connection to the broker. The `rumqttc` event
//! loop runs on its own task; that task is the only place the connection
//! flag is flipped asynchronously (when the transport drops the link), so
//! the flag is an [`AtomicBool`] shared with the session.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use homelink_common::{MqttConfig, topic_matches};

use crate::error::{BridgeError, Result};

/// Grace window given to in-flight work on disconnect.
pub const DISCONNECT_GRACE: Duration = Duration::from_millis(250);

/// Callback invoked for every message received on a subscribed topic.
///
/// Runs on the event loop task, so it must not block.
pub type MessageHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

type HandlerMap = Arc<RwLock<HashMap<String, MessageHandler>>>;

/// Connection to an MQTT broker.
///
/// The session starts disconnected. [`connect`](Self::connect) performs the
/// handshake and never retries on its own; callers decide the retry policy.
/// Once connected, the transport reconnects automatically after a drop, and
/// the connection flag follows the link state. Registered subscriptions are
/// reissued after every CONNACK, whether from the transport's own reconnect
/// or from a later [`connect`](Self::connect) that replaces the client.
pub struct BrokerSession {
    config: MqttConfig,
    client_id: String,
    connected: Arc<AtomicBool>,
    client: Option<AsyncClient>,
    event_loop: Option<JoinHandle<()>>,
    handlers: HandlerMap,
}

impl BrokerSession {
    /// Create a disconnected session.
    ///
    /// `client_id` is used unless the configuration carries its own.
    pub fn new(config: MqttConfig, client_id: impl Into<String>) -> Self {
        let client_id = config.client_id.clone().unwrap_or_else(|| client_id.into());

        Self {
            config,
            client_id,
            connected: Arc::new(AtomicBool::new(false)),
            client: None,
            event_loop: None,
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Broker configuration.
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }

    /// Client identifier sent in the CONNECT packet.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Whether the session currently holds a live connection.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Connect to the broker.
    ///
    /// Succeeds immediately when already connected. Otherwise builds a new
    /// client, starts its event loop and waits for the broker's CONNACK.
    /// On failure the session stays disconnected.
    pub async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        // A previous client may still be retrying in the background
        self.stop_event_loop();

        let address = self.config.address();
        tracing::info!(
            broker = %address,
            client_id = %self.client_id,
            "Connecting to MQTT broker"
        );

        let mut options = MqttOptions::new(&self.client_id, &self.config.host, self.config.port);
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs));
        if let Some(ref username) = self.config.username {
            options.set_credentials(username, self.config.password.clone().unwrap_or_default());
        }

        let (client, event_loop) = AsyncClient::new(options, self.config.channel_capacity);
        let (ready_tx, ready_rx) = oneshot::channel();

        let handle = tokio::spawn(drive_event_loop(
            event_loop,
            client.clone(),
            self.connected.clone(),
            self.handlers.clone(),
            ready_tx,
            Duration::from_secs(self.config.reconnect_delay_secs),
        ));

        let connect_timeout = Duration::from_secs(self.config.connect_timeout_secs);
        let outcome = match timeout(connect_timeout, ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(message))) => Err(BridgeError::connect(&address, message)),
            Ok(Err(_)) => Err(BridgeError::connect(&address, "event loop stopped")),
            Err(_) => Err(BridgeError::connect(
                &address,
                format!("no CONNACK within {}s", self.config.connect_timeout_secs),
            )),
        };

        match outcome {
            Ok(()) => {
                resubscribe(&client, &self.handlers);
                self.client = Some(client);
                self.event_loop = Some(handle);
                tracing::info!(broker = %address, "Connected to MQTT broker");
                Ok(())
            }
            Err(e) => {
                handle.abort();
                self.connected.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Disconnect from the broker.
    ///
    /// Sends a DISCONNECT and gives the event loop [`DISCONNECT_GRACE`] to
    /// flush before stopping it. No-op when already disconnected.
    pub async fn disconnect(&mut self) {
        if !self.is_connected() {
            self.stop_event_loop();
            return;
        }

        if let Some(client) = self.client.take() {
            if let Err(e) = client.disconnect().await {
                tracing::warn!(error = %e, "Failed to send DISCONNECT");
            }
        }

        if let Some(mut handle) = self.event_loop.take() {
            if timeout(DISCONNECT_GRACE, &mut handle).await.is_err() {
                handle.abort();
            }
        }

        self.connected.store(false, Ordering::SeqCst);
        tracing::info!(broker = %self.config.address(), "Disconnected from MQTT broker");
    }

    /// Publish a payload at most once, without the retain flag.
    ///
    /// Fails with [`BridgeError::NotConnected`] without touching the network
    /// when the session is disconnected. At QoS 0 the broker sends no
    /// acknowledgment: success means the client accepted the packet for
    /// sending. A link that drops before the write surfaces through
    /// [`is_connected`](Self::is_connected) and the next `connect`.
    pub async fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>) -> Result<()> {
        let client = self.live_client()?;

        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .await
            .map_err(|e| BridgeError::Publish {
                topic: topic.to_string(),
                message: e.to_string(),
            })
    }

    /// Subscribe to a topic filter and register its message handler.
    ///
    /// A later subscription to the same filter replaces the handler.
    pub async fn subscribe<F>(&self, topic: &str, handler: F) -> Result<()>
    where
        F: Fn(&str, &[u8]) + Send + Sync + 'static,
    {
        let client = self.live_client()?;

        client
            .subscribe(topic, QoS::AtMostOnce)
            .await
            .map_err(|e| BridgeError::Subscribe {
                topic: topic.to_string(),
                message: e.to_string(),
            })?;

        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(topic.to_string(), Arc::new(handler));

        tracing::debug!(topic = %topic, "Subscribed");
        Ok(())
    }

    /// Unsubscribe from a topic filter and drop its handler.
    pub async fn unsubscribe(&self, topic: &str) -> Result<()> {
        let client = self.live_client()?;

        client
            .unsubscribe(topic)
            .await
            .map_err(|e| BridgeError::Unsubscribe {
                topic: topic.to_string(),
                message: e.to_string(),
            })?;

        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(topic);

        tracing::debug!(topic = %topic, "Unsubscribed");
        Ok(())
    }

    /// Number of registered subscription handlers.
    pub fn subscription_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn live_client(&self) -> Result<&AsyncClient> {
        match self.client {
            Some(ref client) if self.is_connected() => Ok(client),
            _ => Err(BridgeError::NotConnected),
        }
    }

    fn stop_event_loop(&mut self) {
        self.client = None;
        if let Some(handle) = self.event_loop.take() {
            handle.abort();
        }
    }
}

impl Drop for BrokerSession {
    fn drop(&mut self) {
        if let Some(handle) = self.event_loop.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for BrokerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerSession")
            .field("broker", &self.config.address())
            .field("client_id", &self.client_id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Drive the `rumqttc` event loop.
///
/// Reports the outcome of the first handshake through `ready`. After that,
/// transport errors mark the session disconnected and polling resumes after
/// `reconnect_delay`, which makes the client reconnect.
async fn drive_event_loop(
    mut event_loop: EventLoop,
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    handlers: HandlerMap,
    ready: oneshot::Sender<std::result::Result<(), String>>,
    reconnect_delay: Duration,
) {
    let mut ready = Some(ready);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                connected.store(true, Ordering::SeqCst);
                match ready.take() {
                    Some(tx) => {
                        let _ = tx.send(Ok(()));
                    }
                    None => {
                        tracing::info!("Reconnected to MQTT broker");
                        resubscribe(&client, &handlers);
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                dispatch(&handlers, &publish.topic, &publish.payload);
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                connected.store(false, Ordering::SeqCst);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Err(e.to_string()));
                    break;
                }

                if connected.swap(false, Ordering::SeqCst) {
                    tracing::warn!(error = %e, "Connection to MQTT broker lost");
                } else {
                    tracing::debug!(error = %e, "Reconnect attempt failed");
                }

                sleep(reconnect_delay).await;
            }
        }
    }
}

/// Queue a SUBSCRIBE for every registered filter.
///
/// Non-blocking: this runs on the event loop task, which is what drains the
/// request channel.
fn resubscribe(client: &AsyncClient, handlers: &HandlerMap) {
    let filters: Vec<String> = handlers
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .keys()
        .cloned()
        .collect();

    for filter in filters {
        match client.try_subscribe(filter.as_str(), QoS::AtMostOnce) {
            Ok(()) => tracing::debug!(topic = %filter, "Resubscribed"),
            Err(e) => tracing::warn!(topic = %filter, error = %e, "Failed to resubscribe"),
        }
    }
}

/// Invoke every handler whose filter matches the topic.
fn dispatch(handlers: &HandlerMap, topic: &str, payload: &[u8]) {
    let matching: Vec<MessageHandler> = handlers
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .iter()
        .filter(|(filter, _)| topic_matches(filter, topic))
        .map(|(_, handler)| handler.clone())
        .collect();

    if matching.is_empty() {
        tracing::debug!(topic = %topic, "Message without handler");
    }

    for handler in matching {
        handler(topic, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const CONNACK: [u8; 4] = [0x20, 0x02, 0x00, 0x00];

    /// Accept one client, read its CONNECT and accept the session.
    async fn accept_client(listener: &TcpListener) -> TcpStream {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 256];
        let n = socket.read(&mut buf).await.unwrap();
        assert_eq!(buf[0] >> 4, 1, "expected CONNECT, got {:?}", &buf[..n]);
        socket.write_all(&CONNACK).await.unwrap();
        socket
    }

    fn local_config(port: u16) -> MqttConfig {
        let mut config = MqttConfig::new("127.0.0.1", port);
        config.connect_timeout_secs = 5;
        // Keep the transport from reconnecting on its own during a test
        config.reconnect_delay_secs = 60;
        config
    }

    async fn wait_disconnected(session: &BrokerSession) {
        timeout(Duration::from_secs(5), async {
            while session.is_connected() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    fn session() -> BrokerSession {
        let mut config = MqttConfig::new("127.0.0.1", 1);
        config.connect_timeout_secs = 1;
        BrokerSession::new(config, "penguinhomelink-test")
    }

    #[test]
    fn test_new_session_is_disconnected() {
        let session = session();
        assert!(!session.is_connected());
        assert_eq!(session.client_id(), "penguinhomelink-test");
        assert_eq!(session.subscription_count(), 0);
    }

    #[test]
    fn test_configured_client_id_wins() {
        let mut config = MqttConfig::new("broker", 1883);
        config.client_id = Some("custom".to_string());
        let session = BrokerSession::new(config, "derived");
        assert_eq!(session.client_id(), "custom");
    }

    #[tokio::test]
    async fn test_publish_while_disconnected() {
        let session = session();
        let result = session.publish("PenguinHomeLink/ABC123/state", "{}").await;
        assert!(matches!(result, Err(BridgeError::NotConnected)));
    }

    #[tokio::test]
    async fn test_subscribe_while_disconnected() {
        let session = session();
        let result = session.subscribe("homeassistant/status", |_, _| {}).await;
        assert!(matches!(result, Err(BridgeError::NotConnected)));
        assert_eq!(session.subscription_count(), 0);

        let result = session.unsubscribe("homeassistant/status").await;
        assert!(result.unwrap_err().is_not_connected());
    }

    #[tokio::test]
    async fn test_disconnect_when_disconnected_is_noop() {
        let mut session = session();
        session.disconnect().await;
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Port 1 on loopback has no broker listening
        let mut session = session();
        let result = session.connect().await;
        assert!(matches!(result, Err(BridgeError::Connect { .. })));
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn test_connect_then_connection_lost() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (close_tx, close_rx) = oneshot::channel::<()>();

        let broker = tokio::spawn(async move {
            let socket = accept_client(&listener).await;
            let _ = close_rx.await;
            drop(socket);
        });

        let mut session = BrokerSession::new(local_config(port), "penguinhomelink-test");
        session.connect().await.unwrap();
        assert!(session.is_connected());

        session
            .publish("PenguinHomeLink/ABC123/state", r#"{"cpu_temp":42.57}"#)
            .await
            .unwrap();

        // Already connected: no second handshake
        session.connect().await.unwrap();

        // Broker drops the link; the event loop flips the flag on its own
        close_tx.send(()).unwrap();
        broker.await.unwrap();
        wait_disconnected(&session).await;

        let result = session.publish("PenguinHomeLink/ABC123/state", "{}").await;
        assert!(matches!(result, Err(BridgeError::NotConnected)));
    }

    #[tokio::test]
    async fn test_subscriptions_reissued_after_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (close_tx, close_rx) = oneshot::channel::<()>();
        let (packet_tx, packet_rx) = oneshot::channel::<u8>();

        tokio::spawn(async move {
            let first = accept_client(&listener).await;
            let _ = close_rx.await;
            drop(first);

            let mut second = accept_client(&listener).await;
            let mut buf = [0u8; 256];
            let n = second.read(&mut buf).await.unwrap();
            if n > 0 {
                let _ = packet_tx.send(buf[0]);
            }
        });

        let mut session = BrokerSession::new(local_config(port), "penguinhomelink-test");
        session.connect().await.unwrap();
        session
            .subscribe("homeassistant/status", |_, _| {})
            .await
            .unwrap();
        assert_eq!(session.subscription_count(), 1);

        close_tx.send(()).unwrap();
        wait_disconnected(&session).await;

        session.connect().await.unwrap();
        assert!(session.is_connected());

        // First packet on the new link is a SUBSCRIBE (0x82)
        let first_packet = timeout(Duration::from_secs(5), packet_rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first_packet, 0x82);
        assert_eq!(session.subscription_count(), 1);
    }

    #[test]
    fn test_dispatch_matches_filters() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handlers: HandlerMap = Arc::new(RwLock::new(HashMap::new()));

        let counter = hits.clone();
        handlers.write().unwrap().insert(
            "homeassistant/+".to_string(),
            Arc::new(move |_: &str, payload: &[u8]| {
                assert_eq!(payload, b"online");
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        dispatch(&handlers, "homeassistant/status", b"online");
        dispatch(&handlers, "other/status", b"online");

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
