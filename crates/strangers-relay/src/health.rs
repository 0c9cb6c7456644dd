//! Liveness endpoint: answers any HTTP request with a small JSON status body.

use std::time::Duration;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use serde::Serialize;
use strangers_core::SessionCoordinator;
use tokio::net::TcpListener;

use crate::directory::Directory;

/// A client that has not finished sending its request headers by then is
/// dropped.
const HEADER_READ_TIMEOUT: Duration = Duration::from_secs(2);
/// Hard cap on the lifetime of one health connection.
const CONNECTION_DEADLINE: Duration = Duration::from_secs(3);

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub waiting: usize,
    pub active_sessions: usize,
    pub connections: usize,
}

pub async fn report(coordinator: &SessionCoordinator, directory: &Directory) -> HealthReport {
    let stats = coordinator.stats();
    HealthReport {
        status: "ok",
        waiting: stats.waiting,
        active_sessions: stats.active_sessions,
        connections: directory.count().await,
    }
}

#[derive(Clone)]
struct HealthState {
    coordinator: SessionCoordinator,
    directory: Directory,
}

async fn handle_health(State(state): State<HealthState>) -> Json<HealthReport> {
    Json(report(&state.coordinator, &state.directory).await)
}

// ── Router ────────────────────────────────────────────────────────────────────

fn router(coordinator: SessionCoordinator, directory: Directory) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .fallback(handle_health)
        .with_state(HealthState {
            coordinator,
            directory,
        })
}

/// Serve the endpoint until the process exits. Each connection is HTTP/1 only,
/// closed after one response, and bounded by the read and lifetime limits.
pub async fn serve(listener: TcpListener, coordinator: SessionCoordinator, directory: Directory) {
    let app = router(coordinator, directory);

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "Health endpoint accept error");
                continue;
            }
        };

        let service = TowerToHyperService::new(app.clone());
        tokio::spawn(async move {
            let mut builder = http1::Builder::new();
            builder
                .timer(TokioTimer::new())
                .header_read_timeout(HEADER_READ_TIMEOUT)
                .keep_alive(false);
            let conn = builder.serve_connection(TokioIo::new(stream), service);

            match tokio::time::timeout(CONNECTION_DEADLINE, conn).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::debug!(peer = %addr, error = %e, "Health endpoint connection failed");
                }
                Err(_) => {
                    tracing::debug!(peer = %addr, "Health endpoint connection timed out");
                }
            }
        });
    }
}
