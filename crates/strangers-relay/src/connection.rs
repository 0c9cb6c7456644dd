//! Per-connection handler: identify, register, then translate frames into
//! coordinator events and deliver the resulting effects.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use strangers_common::{new_correlation_id, ConnectionId, Event, UserId};
use strangers_core::Effect;
use tokio::net::TcpStream;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::Instrument;

use crate::directory::Directory;
use crate::protocol::{ClientFrame, ClientHello, ServerFrame};
use crate::render::render;
use crate::server::RelayContext;

type WsSink = futures_util::stream::SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = futures_util::stream::SplitStream<WebSocketStream<TcpStream>>;
type WsResult = Result<(), tokio_tungstenite::tungstenite::Error>;

/// Handle a single WebSocket connection.
pub async fn handle_connection(ws: WebSocketStream<TcpStream>, addr: SocketAddr, ctx: RelayContext) {
    let span = tracing::info_span!("conn", peer = %addr, cid = %new_correlation_id());
    run_connection(ws, addr, ctx).instrument(span).await
}

async fn run_connection(ws: WebSocketStream<TcpStream>, addr: SocketAddr, ctx: RelayContext) {
    let (mut sink, mut stream) = ws.split();
    let mut shutdown = ctx.events.subscribe();

    // 1. Read the hello message to identify this user.
    let Some((user, name)) = read_hello(&mut stream, addr, ctx.settings.hello_timeout).await else {
        let _ = send_frame(&mut sink, &ServerFrame::error("expected hello")).await;
        return;
    };

    // 2. Create our receive channel and register.
    let conn = ConnectionId::new();
    let (tx, mut rx) = mpsc::channel::<ServerFrame>(ctx.settings.outbound_buffer);
    if ctx.directory.register(&user, conn.clone(), tx).await {
        tracing::info!(user = %user, "Replaced previous connection");
    }
    tracing::info!(user = %user, conn = %conn, "Client registered");

    // 3. Send ready.
    let ready = ServerFrame::Ready {
        user_id: user.to_string(),
    };
    if send_frame(&mut sink, &ready).await.is_ok() {
        // 4. Event loop.
        loop {
            tokio::select! {
                // Frames other connections routed to us → this client's WebSocket
                frame = rx.recv() => match frame {
                    Some(frame) => {
                        if send_frame(&mut sink, &frame).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        tracing::debug!(user = %user, "Connection superseded");
                        break;
                    }
                },

                // Frames from this client → coordinator
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if handle_text(&text, &user, &name, &ctx, &mut sink).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        let reply = ServerFrame::error("only text frames are supported");
                        if send_frame(&mut sink, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "WS error");
                        break;
                    }
                    _ => {}
                },

                event = shutdown.recv() => {
                    if matches!(event, Ok(Event::Shutdown) | Err(RecvError::Closed)) {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    // 5. Cleanup. A superseded connection no longer owns the route and must
    //    leave the user's session alone.
    tracing::info!(user = %user, conn = %conn, "Client disconnected");
    let released = ctx
        .directory
        .release(&user, &conn, || ctx.coordinator.on_disconnect(&user))
        .await;
    if let Some(effects) = released {
        ctx.directory.dispatch(effects).await;
    }
}

/// Decode one client frame, run it through the coordinator, deliver effects.
async fn handle_text(
    text: &str,
    user: &UserId,
    name: &str,
    ctx: &RelayContext,
    sink: &mut WsSink,
) -> WsResult {
    match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => {
            let event = frame.into_event(name);
            tracing::debug!(user = %user, event = event.name(), "Inbound event");
            let effects = ctx.coordinator.on_user_event(user, event);
            deliver(sink, user, effects, &ctx.directory).await
        }
        Err(e) => {
            tracing::debug!(user = %user, error = %e, "Invalid frame");
            send_frame(sink, &ServerFrame::error(format!("invalid frame: {e}"))).await
        }
    }
}

/// Effects addressed to this connection's own user go straight to its
/// socket; the rest are routed through the directory.
async fn deliver(
    sink: &mut WsSink,
    user: &UserId,
    effects: Vec<Effect>,
    directory: &Directory,
) -> WsResult {
    for effect in effects {
        if &effect.to == user {
            send_frame(sink, &render(effect.message)).await?;
        } else {
            directory.dispatch(vec![effect]).await;
        }
    }
    Ok(())
}

/// Read and parse the first message as a ClientHello.
async fn read_hello(
    stream: &mut WsStream,
    addr: SocketAddr,
    timeout: Duration,
) -> Option<(UserId, String)> {
    let frame = tokio::time::timeout(timeout, stream.next()).await;

    match frame {
        Ok(Some(Ok(Message::Text(text)))) => match serde_json::from_str::<ClientHello>(&text) {
            Ok(ClientHello::Hello { user_id, .. }) if user_id.trim().is_empty() => {
                tracing::warn!(peer = %addr, "Hello with empty user_id");
                None
            }
            Ok(ClientHello::Hello { user_id, name }) => Some((UserId::from(user_id), name)),
            Err(e) => {
                tracing::warn!(peer = %addr, error = %e, "Invalid hello message");
                None
            }
        },
        Ok(Some(Ok(_))) => {
            tracing::warn!(peer = %addr, "Expected text hello, got another frame");
            None
        }
        Ok(Some(Err(e))) => {
            tracing::warn!(peer = %addr, error = %e, "WS error during hello");
            None
        }
        Ok(None) => {
            tracing::debug!(peer = %addr, "Connection closed before hello");
            None
        }
        Err(_) => {
            tracing::warn!(peer = %addr, timeout_secs = timeout.as_secs(), "Hello timeout");
            None
        }
    }
}

/// Send a ServerFrame as a JSON text frame.
async fn send_frame(sink: &mut WsSink, frame: &ServerFrame) -> WsResult {
    sink.send(Message::Text(frame.to_json().into())).await
}
