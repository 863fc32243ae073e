//! central-server: Registry for camera nodes.
//!
//! Provides:
//! - `POST /api/register` for node heartbeats
//! - `GET /api/cameras` listing the nodes that are alive
//! - `GET /api/health` for the server itself
//!
//! The health prober and eviction sweeper from `registry-core` run beside the router
//! and share its `PeerStore`.

pub mod api;
pub mod config;
pub mod probe;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use registry_core::PeerStore;
use tower_http::trace::TraceLayer;

pub use config::{ConfigError, ServerConfig};
pub use probe::HttpHealthCheck;

/// Shared application state
pub struct AppState {
    pub store: Arc<PeerStore>,
    /// Nodes older than this are hidden from listings
    pub heartbeat_timeout: Duration,
}

/// Build the HTTP router over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/register", post(api::register))
        .route("/api/cameras", get(api::cameras))
        .route("/api/health", get(api::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
