//! central-server: Aggregates camera nodes that register over HTTP.
//!
//! Runs the registration API beside two background loops sharing one `PeerStore`:
//! a health prober and an eviction sweeper.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use central_server::{router, AppState, HttpHealthCheck, ServerConfig};
use registry_core::{EvictionSweeper, HealthProber, MonotonicClock, PeerStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "central_server=info,registry_core=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::parse();
    config.validate()?;
    let addr = config.socket_addr()?;

    let store = Arc::new(PeerStore::new(Arc::new(MonotonicClock::new())));

    let check = HttpHealthCheck::new(config.probe_timeout())
        .context("Failed to create HTTP client for health probes")?;
    let prober = HealthProber::new(store.clone(), check, config.probe_config());
    let sweeper = EvictionSweeper::new(
        store.clone(),
        config.heartbeat_timeout(),
        config.sweep_interval(),
    );
    let prober_task = tokio::spawn(prober.run());
    let sweeper_task = tokio::spawn(sweeper.run());

    let state = Arc::new(AppState {
        store,
        heartbeat_timeout: config.heartbeat_timeout(),
    });
    let app = router(state);

    tracing::info!("Starting central server on http://{}", addr);
    tracing::info!("Heartbeat timeout: {:?}", config.heartbeat_timeout());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    prober_task.abort();
    sweeper_task.abort();
    tracing::info!("Central server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
