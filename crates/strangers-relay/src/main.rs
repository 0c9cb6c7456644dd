//! strangers-relay: WebSocket front end for anonymous one-to-one chat.
//!
//! Accepts WebSocket connections, feeds each user's commands into the
//! pairing coordinator, and forwards chat messages between paired users.
//! The relay never inspects message payloads.

mod connection;
mod directory;
mod health;
mod protocol;
mod render;
mod server;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use strangers_common::{Event, EventBus, StrangersError};
use strangers_config::{LogLevel, StrangersConfig};
use strangers_core::{CoordinatorConfig, SessionCoordinator};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::directory::Directory;
use crate::server::{ConnectionSettings, RelayContext};

#[derive(Parser)]
#[command(name = "strangers-relay", about = "Pairs anonymous users for one-to-one chat")]
struct Args {
    /// Config file to load instead of the platform default.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// WebSocket port, overriding the config file.
    #[arg(short, long)]
    port: Option<u16>,

    /// Health endpoint port, overriding the config file.
    #[arg(long)]
    health_port: Option<u16>,

    /// Log filter directive (e.g. `debug` or `strangers_core=debug`).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // The real filter depends on the config, so loading runs under a
    // bootstrap subscriber that already honours RUST_LOG and --log-level.
    let bootstrap_directive = args
        .log_level
        .as_deref()
        .unwrap_or(LogLevel::default().as_directive());
    let loaded = tracing::subscriber::with_default(
        tracing_subscriber::fmt().with_env_filter(log_filter(bootstrap_directive)).finish(),
        || load(&args),
    );

    let level = loaded
        .as_ref()
        .map(|config| config.logging.level)
        .unwrap_or_default();
    init_logging(args.log_level.as_deref().unwrap_or(level.as_directive()));

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Config load failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("strangers-relay failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Load the config file and apply command-line overrides, validating the
/// result.
fn load(args: &Args) -> strangers_common::Result<StrangersConfig> {
    let mut config = strangers_config::load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = u32::from(port);
    }
    if let Some(port) = args.health_port {
        config.server.health_port = u32::from(port);
    }
    strangers_config::validation::validate(&config)?;
    Ok(config)
}

fn log_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
}

fn init_logging(directive: &str) {
    tracing_subscriber::fmt().with_env_filter(log_filter(directive)).init();
}

async fn bind(addr: &str) -> strangers_common::Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!(addr, error = %e, "Failed to bind");
        StrangersError::from(e)
    })
}

async fn run(config: StrangersConfig) -> strangers_common::Result<()> {
    let coordinator = SessionCoordinator::new(CoordinatorConfig {
        group_link: config.matching.group_link.clone(),
    });
    let ctx = RelayContext {
        coordinator: coordinator.clone(),
        directory: Directory::new(),
        events: Arc::new(EventBus::new(16)),
        settings: ConnectionSettings::from_config(&config),
    };

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = bind(&addr).await?;
    tracing::info!("strangers-relay listening on {}", addr);

    let health_addr = format!("{}:{}", config.server.bind, config.server.health_port);
    let health_listener = bind(&health_addr).await?;
    tracing::info!("Health endpoint on http://{}/health", health_addr);
    tokio::spawn(health::serve(
        health_listener,
        coordinator,
        ctx.directory.clone(),
    ));

    // Ctrl-C → broadcast shutdown to the accept loop and every connection.
    let events = Arc::clone(&ctx.events);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested");
                events.publish(Event::Shutdown);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });

    server::serve(listener, ctx).await;
    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn args(config: &std::path::Path, extra: &[&str]) -> Args {
        let mut argv = vec!["strangers-relay", "--config", config.to_str().unwrap()];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn loader_messages_reach_the_bootstrap_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("info"))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let config = tracing::subscriber::with_default(subscriber, || load(&args(&path, &[])))
            .unwrap();
        assert_eq!(config.server.port, 9000);

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("loaded config from"), "got: {output}");
    }

    #[test]
    fn cli_overrides_are_applied_and_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let config = load(&args(&path, &["--port", "9100", "--health-port", "9101"])).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.health_port, 9101);

        let err = load(&args(&path, &["--port", "9100", "--health-port", "9100"])).unwrap_err();
        assert!(matches!(err, StrangersError::Config(_)));
    }

    #[tokio::test]
    async fn bind_failure_surfaces_as_io_error() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap().to_string();

        let err = bind(&addr).await.unwrap_err();
        assert!(matches!(err, StrangersError::Io(_)));
    }
}
