//! HTTP server command implementation.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use chatrelay::background::BackgroundTasks;
use chatrelay::broadcast::EventBroadcaster;
use chatrelay::chat::{ChatService, spawn_sweeper};
use chatrelay::config::Config;
use chatrelay::server::{self, AppState};
use chatrelay::store::MemoryStore;

pub async fn run(
    config_path: &str,
    host_override: Option<IpAddr>,
    port_override: Option<u16>,
) -> Result<()> {
    let mut config = Config::load(config_path).await?;

    // CLI overrides config
    if let Some(host) = host_override {
        config.server.host = host.to_string();
    }
    if let Some(port) = port_override {
        config.server.port = port;
    }

    // Broadcaster and chat core share one process-wide lifecycle: built
    // here, torn down when the server stops.
    let broadcaster = EventBroadcaster::new();
    let store = Arc::new(MemoryStore::new());
    let chat = ChatService::new(store, broadcaster, config.chat.clone());

    // Spawn the abandonment sweeper
    let background_tasks = BackgroundTasks::new();
    let sweeper_shutdown = CancellationToken::new();
    spawn_sweeper(&background_tasks, chat.clone(), sweeper_shutdown.clone());
    info!(
        threshold_minutes = config.chat.abandon_after_minutes,
        interval_seconds = config.chat.sweep_interval_seconds,
        "Abandonment sweeper enabled"
    );

    // Create shutdown channel for HTTP-triggered shutdown
    let (shutdown_tx, shutdown_rx) = server::shutdown_channel();

    let state = AppState {
        chat,
        admin_token: config.server.admin_token.clone(),
        keep_alive_interval_seconds: config.server.keep_alive_interval_seconds,
        max_connections: config.server.max_connections,
        background_tasks: background_tasks.clone(),
        shutdown_tx: Arc::new(Mutex::new(Some(shutdown_tx))),
    };

    let app = server::build_app(state, config.server.request_timeout_seconds);

    let ip: IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::new(ip, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(addr = %addr, "Starting server");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(shutdown_rx))
    .await?;

    // Stop the sweeper, then wait for background tasks before exiting
    sweeper_shutdown.cancel();
    background_tasks.shutdown().await;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(http_shutdown: tokio::sync::oneshot::Receiver<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
        _ = http_shutdown => info!("Received shutdown request via HTTP, shutting down..."),
    }
}
