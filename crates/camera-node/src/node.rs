//! Node identity, self-observed state, and the node's own HTTP API.
//!
//! The central server probes `GET /api/health`; `GET /api/info` returns the same
//! payload the node announces on every heartbeat.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use registry_core::{Announcement, NodeHealth, PeerStatus, Resolution};

/// Static facts about this node, fixed at startup.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    pub id: String,
    pub name: String,
    /// Port the node's API listens on
    pub port: u16,
    pub resolution: Resolution,
    /// Fixed address to announce instead of the discovered one
    pub ip_override: Option<String>,
}

impl NodeIdentity {
    /// Short random id: first 8 hex chars of a v4 UUID.
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
    }

    /// `camera-<hostname>`
    pub fn default_name() -> String {
        format!("camera-{}", host_name())
    }
}

/// Shared, mutable view of the node used by the API and the registration client.
pub struct NodeState {
    identity: NodeIdentity,
    status: RwLock<PeerStatus>,
}

impl NodeState {
    pub fn new(identity: NodeIdentity) -> Self {
        Self {
            identity,
            status: RwLock::new(PeerStatus::Initializing),
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn id(&self) -> &str {
        &self.identity.id
    }

    pub fn status(&self) -> PeerStatus {
        *self.status.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_status(&self, status: PeerStatus) {
        let mut current = self.status.write().unwrap_or_else(|e| e.into_inner());
        if *current != status {
            tracing::info!("Node status {} -> {}", *current, status);
            *current = status;
        }
    }

    /// Address to announce: the override, else the default interface, else loopback.
    pub fn current_ip(&self) -> String {
        if let Some(ip) = &self.identity.ip_override {
            return ip.clone();
        }
        match discover_local_ip() {
            Some(ip) => ip.to_string(),
            None => {
                tracing::warn!("Could not determine local IP address, announcing 127.0.0.1");
                Ipv4Addr::LOCALHOST.to_string()
            }
        }
    }

    /// Current self-observed state as a registration payload.
    pub fn announcement(&self) -> Announcement {
        Announcement {
            id: Some(self.identity.id.clone()),
            name: Some(self.identity.name.clone()),
            ip: Some(self.current_ip()),
            port: Some(self.identity.port),
            status: Some(self.status()),
            resolution: Some(self.identity.resolution),
            last_heartbeat: Some(unix_time_secs()),
        }
    }
}

/// Build the node's HTTP router.
pub fn router(state: Arc<NodeState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/info", get(info))
        .with_state(state)
}

/// Handler for `GET /api/health`
async fn health(State(state): State<Arc<NodeState>>) -> (StatusCode, Json<NodeHealth>) {
    if state.status() == PeerStatus::Running {
        (StatusCode::OK, Json(NodeHealth::ok()))
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(NodeHealth::not_running()))
    }
}

/// Handler for `GET /api/info`
async fn info(State(state): State<Arc<NodeState>>) -> Json<Announcement> {
    Json(state.announcement())
}

/// IPv4 address of the interface that carries the default route.
pub fn discover_local_ip() -> Option<IpAddr> {
    match local_ip_address::local_ip() {
        Ok(ip) if !ip.is_unspecified() => Some(ip),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Failed to discover local IP: {}", e);
            None
        }
    }
}

fn host_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn unix_time_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
