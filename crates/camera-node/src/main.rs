//! camera-node: Serves the node API and registers with the central server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use registry_core::PeerStatus;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use camera_node::{router, HttpAnnouncer, NodeConfig, NodeState, RegistrationClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camera_node=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = NodeConfig::parse();
    config.validate()?;

    let addr: SocketAddr = format!("{}:{}", config.bind, config.api_port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind, config.api_port))?;

    let node = Arc::new(NodeState::new(config.identity()));
    tracing::info!(
        "Camera node {} ({}) starting, central server {}",
        node.id(),
        node.identity().name,
        config.central_server
    );

    let announcer = HttpAnnouncer::new(&config.central_server, config.register_timeout())
        .context("Failed to create HTTP client for registration")?;
    let client = RegistrationClient::new(announcer, node.clone(), config.client_config());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Node API listening on http://{}", addr);
    node.set_status(PeerStatus::Running);

    let client_task = tokio::spawn(client.run());

    axum::serve(listener, router(node.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    client_task.abort();
    tracing::info!("Camera node shut down");
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
