//! Accept loop and the state shared by every connection task.

use std::sync::Arc;
use std::time::Duration;

use strangers_common::{Event, EventBus};
use strangers_config::StrangersConfig;
use strangers_core::SessionCoordinator;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinSet;
use tokio_tungstenite::accept_async_with_config;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::connection::handle_connection;
use crate::directory::Directory;

/// How long open connections get to close after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Per-connection limits taken from the config.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub hello_timeout: Duration,
    pub outbound_buffer: usize,
    pub max_frame_bytes: usize,
}

impl ConnectionSettings {
    pub fn from_config(config: &StrangersConfig) -> Self {
        Self {
            hello_timeout: Duration::from_secs(u64::from(config.server.hello_timeout)),
            outbound_buffer: config.matching.outbound_buffer as usize,
            max_frame_bytes: config.matching.max_frame_kib as usize * 1024,
        }
    }

    pub fn ws_config(&self) -> WebSocketConfig {
        let mut ws_config = WebSocketConfig::default();
        ws_config.max_message_size = Some(self.max_frame_bytes);
        ws_config.max_frame_size = Some(self.max_frame_bytes);
        ws_config
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from_config(&StrangersConfig::default())
    }
}

/// Everything a connection task needs, cheap to clone.
#[derive(Clone)]
pub struct RelayContext {
    pub coordinator: SessionCoordinator,
    pub directory: Directory,
    pub events: Arc<EventBus>,
    pub settings: ConnectionSettings,
}

/// Accept WebSocket clients until a shutdown event arrives, then give the
/// open connections a grace period to close.
pub async fn serve(listener: TcpListener, ctx: RelayContext) {
    let mut shutdown = ctx.events.subscribe();
    let mut tasks = JoinSet::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let ctx = ctx.clone();
                    tasks.spawn(async move {
                        match accept_async_with_config(stream, Some(ctx.settings.ws_config())).await {
                            Ok(ws) => handle_connection(ws, addr, ctx).await,
                            Err(e) => {
                                tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                            }
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            },
            event = shutdown.recv() => {
                if matches!(event, Ok(Event::Shutdown) | Err(RecvError::Closed)) {
                    break;
                }
            }
        }

        // Reap finished connection tasks.
        while tasks.try_join_next().is_some() {}
    }

    tracing::info!(open = tasks.len(), "Waiting for connections to close");
    let drained = tokio::time::timeout(SHUTDOWN_GRACE, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!(open = tasks.len(), "Grace period over, dropping remaining connections");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use tokio::net::TcpStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn start() -> (String, RelayContext) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let ctx = RelayContext {
            coordinator: SessionCoordinator::default(),
            directory: Directory::new(),
            events: Arc::new(EventBus::new(16)),
            settings: ConnectionSettings {
                hello_timeout: Duration::from_secs(1),
                ..ConnectionSettings::default()
            },
        };
        tokio::spawn(serve(listener, ctx.clone()));
        (format!("ws://{addr}"), ctx)
    }

    async fn send(ws: &mut Client, value: Value) {
        ws.send(Message::Text(value.to_string().into())).await.unwrap();
    }

    async fn recv(ws: &mut Client) -> Value {
        loop {
            let frame = tokio::time::timeout(Duration::from_secs(2), ws.next())
                .await
                .expect("timed out waiting for a frame")
                .expect("stream ended")
                .expect("ws error");
            if let Message::Text(text) = frame {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    async fn connect(url: &str, user: &str) -> Client {
        let (mut ws, _) = connect_async(url).await.unwrap();
        send(&mut ws, json!({"type": "hello", "user_id": user, "name": user})).await;
        let ready = recv(&mut ws).await;
        assert_eq!(ready["type"], "ready");
        assert_eq!(ready["user_id"], user);
        ws
    }

    async fn pair(url: &str) -> (Client, Client) {
        let mut a = connect(url, "alice").await;
        let mut b = connect(url, "bob").await;
        send(&mut a, json!({"type": "match"})).await;
        assert_eq!(recv(&mut a).await["kind"], "waiting");
        send(&mut b, json!({"type": "match"})).await;
        assert_eq!(recv(&mut b).await["kind"], "connected");
        assert_eq!(recv(&mut a).await["kind"], "connected");
        (a, b)
    }

    #[tokio::test]
    async fn paired_users_chat_and_end() {
        let (url, _ctx) = start().await;
        let (mut a, mut b) = pair(&url).await;

        send(&mut a, json!({"type": "message", "text": "hi"})).await;
        assert_eq!(recv(&mut b).await, json!({"type": "message", "text": "hi"}));

        send(&mut a, json!({"type": "message", "text": "❌ End Chat"})).await;
        assert_eq!(recv(&mut a).await["kind"], "left_session");
        assert_eq!(recv(&mut b).await["kind"], "partner_left");
    }

    #[tokio::test]
    async fn start_command_sends_welcome_with_keyboard() {
        let (url, _ctx) = start().await;
        let mut a = connect(&url, "alice").await;

        send(&mut a, json!({"type": "message", "text": "/start"})).await;
        let welcome = recv(&mut a).await;
        assert_eq!(welcome["kind"], "welcome");
        assert!(welcome["text"].as_str().unwrap().contains("alice"));
        assert_eq!(welcome["keyboard"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn disconnect_tells_partner() {
        let (url, ctx) = start().await;
        let (mut a, mut b) = pair(&url).await;

        a.close(None).await.unwrap();
        assert_eq!(recv(&mut b).await["kind"], "partner_left");
        assert_eq!(ctx.coordinator.stats().active_sessions, 0);
    }

    #[tokio::test]
    async fn bad_hello_is_rejected() {
        let (url, _ctx) = start().await;
        let (mut ws, _) = connect_async(url.as_str()).await.unwrap();

        send(&mut ws, json!({"type": "match"})).await;
        let reply = recv(&mut ws).await;
        assert_eq!(reply["type"], "error");
    }

    #[tokio::test]
    async fn invalid_frame_gets_error_and_keeps_connection() {
        let (url, _ctx) = start().await;
        let mut a = connect(&url, "alice").await;

        send(&mut a, json!({"type": "dance"})).await;
        assert_eq!(recv(&mut a).await["type"], "error");

        send(&mut a, json!({"type": "end"})).await;
        assert_eq!(recv(&mut a).await["kind"], "not_in_session");
    }

    #[tokio::test]
    async fn shutdown_closes_connections() {
        let (url, ctx) = start().await;
        let mut a = connect(&url, "alice").await;

        ctx.events.publish(Event::Shutdown);

        let frame = tokio::time::timeout(Duration::from_secs(2), a.next())
            .await
            .expect("connection should close promptly");
        assert!(matches!(frame, Some(Ok(Message::Close(_))) | None));
    }
}
