//! Directory: maps user IDs to the outbound channel of their live connection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use strangers_common::{ConnectionId, UserId};
use strangers_core::Effect;
use tokio::sync::{mpsc, RwLock};
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::protocol::ServerFrame;
use crate::render::render;

pub type FrameSender = mpsc::Sender<ServerFrame>;

/// How long a delivery may wait on a full outbound buffer before the frame
/// is dropped.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

struct Route {
    conn: ConnectionId,
    tx: FrameSender,
}

/// Thread-safe user → connection directory.
#[derive(Clone, Default)]
pub struct Directory {
    routes: Arc<RwLock<HashMap<UserId, Route>>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user`. A previous connection for the same
    /// user is told it was replaced and loses its route; returns whether that
    /// happened.
    pub async fn register(&self, user: &UserId, conn: ConnectionId, tx: FrameSender) -> bool {
        let previous = self
            .routes
            .write()
            .await
            .insert(user.clone(), Route { conn, tx });

        match previous {
            Some(old) => {
                let _ = old
                    .tx
                    .try_send(ServerFrame::error("signed in from another connection"));
                true
            }
            None => false,
        }
    }

    /// Remove `user`'s route if it still belongs to `conn`, and run
    /// `on_released` before the write lock is dropped. A reconnect for the
    /// same user cannot register in between. Returns `None` when `conn` no
    /// longer owns the route.
    pub async fn release<T>(
        &self,
        user: &UserId,
        conn: &ConnectionId,
        on_released: impl FnOnce() -> T,
    ) -> Option<T> {
        let mut routes = self.routes.write().await;
        match routes.get(user) {
            Some(route) if &route.conn == conn => {
                routes.remove(user);
                Some(on_released())
            }
            _ => None,
        }
    }

    pub async fn sender_for(&self, user: &UserId) -> Option<FrameSender> {
        self.routes.read().await.get(user).map(|route| route.tx.clone())
    }

    /// Number of connected users.
    pub async fn count(&self) -> usize {
        self.routes.read().await.len()
    }

    /// Render and deliver effects. Recipients that went offline in the
    /// meantime are skipped.
    pub async fn dispatch(&self, effects: Vec<Effect>) {
        for effect in effects {
            let Some(tx) = self.sender_for(&effect.to).await else {
                tracing::debug!(user = %effect.to, "Recipient offline, dropping notice");
                continue;
            };
            match tx.send_timeout(render(effect.message), DELIVERY_TIMEOUT).await {
                Ok(()) => {}
                Err(SendTimeoutError::Timeout(_)) => {
                    tracing::warn!(user = %effect.to, "Outbound buffer full, dropping frame");
                }
                Err(SendTimeoutError::Closed(_)) => {
                    tracing::debug!(user = %effect.to, "Recipient channel closed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strangers_core::OutboundMessage;

    fn uid(s: &str) -> UserId {
        UserId::from(s)
    }

    #[tokio::test]
    async fn dispatch_routes_to_registered_user() {
        let dir = Directory::new();
        let (tx, mut rx) = mpsc::channel(8);
        dir.register(&uid("a"), ConnectionId::new(), tx).await;

        dir.dispatch(vec![Effect::new(uid("a"), OutboundMessage::Connected)])
            .await;

        let frame = rx.recv().await.unwrap();
        assert!(matches!(frame, ServerFrame::Notice { ref kind, .. } if kind == "connected"));
    }

    #[tokio::test]
    async fn dispatch_skips_offline_users() {
        let dir = Directory::new();
        let (tx, mut rx) = mpsc::channel(8);
        dir.register(&uid("a"), ConnectionId::new(), tx).await;

        dir.dispatch(vec![
            Effect::new(uid("ghost"), OutboundMessage::PartnerLeft),
            Effect::new(
                uid("a"),
                OutboundMessage::Relayed {
                    payload: "hi".into(),
                },
            ),
        ])
        .await;

        assert_eq!(rx.recv().await.unwrap(), ServerFrame::Message { text: "hi".into() });
    }

    #[tokio::test]
    async fn reconnect_replaces_and_notifies_old_connection() {
        let dir = Directory::new();
        let old_conn = ConnectionId::new();
        let new_conn = ConnectionId::new();
        let (old_tx, mut old_rx) = mpsc::channel(8);
        let (new_tx, _new_rx) = mpsc::channel(8);

        assert!(!dir.register(&uid("a"), old_conn.clone(), old_tx).await);
        assert!(dir.register(&uid("a"), new_conn.clone(), new_tx).await);

        assert!(matches!(old_rx.recv().await, Some(ServerFrame::Error { .. })));
        // The directory dropped the old sender, so the old channel is closed.
        assert!(old_rx.recv().await.is_none());

        // Stale cleanup must not evict the newer connection.
        assert_eq!(dir.release(&uid("a"), &old_conn, || ()).await, None);
        assert_eq!(dir.count().await, 1);
        assert_eq!(dir.release(&uid("a"), &new_conn, || ()).await, Some(()));
        assert_eq!(dir.count().await, 0);
    }

    #[tokio::test]
    async fn release_runs_cleanup_under_the_write_lock() {
        let dir = Directory::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = mpsc::channel(8);
        dir.register(&uid("a"), conn.clone(), tx).await;

        // While the cleanup runs nobody can take the map, so a reconnect
        // has to wait until it is done.
        let locked = dir
            .release(&uid("a"), &conn, || dir.routes.try_write().is_err())
            .await;
        assert_eq!(locked, Some(true));
    }

    #[tokio::test]
    async fn stale_release_skips_cleanup_after_reconnect() {
        let dir = Directory::new();
        let old_conn = ConnectionId::new();
        let (old_tx, _old_rx) = mpsc::channel(8);
        let (new_tx, _new_rx) = mpsc::channel(8);
        dir.register(&uid("a"), old_conn.clone(), old_tx).await;
        dir.register(&uid("a"), ConnectionId::new(), new_tx).await;

        let mut ran = false;
        let released = dir.release(&uid("a"), &old_conn, || ran = true).await;

        assert_eq!(released, None);
        assert!(!ran);
        assert!(dir.sender_for(&uid("a")).await.is_some());
    }
}
