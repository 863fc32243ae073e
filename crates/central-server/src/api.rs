//! HTTP handlers for node registration and listing.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use registry_core::{
    is_alive, Announcement, CameraView, ErrorBody, PeerRecord, RegisterAck, StoreError,
    UpsertOutcome,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::AppState;

/// Body of the server's own `GET /api/health`.
#[derive(Debug, Serialize)]
pub struct ServerHealth {
    pub status: &'static str,
    pub cameras: usize,
}

/// Decode a registration body. Only `id` is required and must be a non-empty
/// string; every other field is advisory and dropped if it has the wrong shape.
pub fn decode_announcement(body: &Value) -> Option<Announcement> {
    let node_id = body
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())?;

    Some(Announcement {
        id: Some(node_id.to_string()),
        name: advisory(body, node_id, "name"),
        ip: advisory(body, node_id, "ip"),
        port: advisory(body, node_id, "port"),
        status: advisory(body, node_id, "status"),
        resolution: advisory(body, node_id, "resolution"),
        last_heartbeat: advisory(body, node_id, "last_heartbeat"),
    })
}

fn advisory<T: DeserializeOwned>(body: &Value, node_id: &str, field: &str) -> Option<T> {
    let value = body.get(field).filter(|v| !v.is_null())?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!("Ignoring {} from node {}: {} ({})", field, node_id, value, e);
            None
        }
    }
}

/// Handler for `POST /api/register`
///
/// Creates or refreshes the node's record. The heartbeat time is the server's
/// receipt time; whatever the node reports about its own clock is only logged.
pub async fn register(State(state): State<Arc<AppState>>, body: Bytes) -> impl IntoResponse {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Rejected malformed registration: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new(format!("Invalid registration payload: {}", e))),
            )
                .into_response();
        }
    };

    let Some(announcement) = decode_announcement(&body) else {
        tracing::error!("Registration without a node ID");
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new(StoreError::EmptyId.to_string())),
        )
            .into_response();
    };
    let node_id = announcement.node_id().unwrap_or_default();

    if let Some(reported) = announcement.last_heartbeat {
        tracing::debug!("Node {} reports its clock at {:.3}", node_id, reported);
    }

    match state.store.upsert(node_id, &announcement.to_update()) {
        Ok(UpsertOutcome::Created(record)) => {
            tracing::info!("Registered new node {} ({})", record.id, record.name);
            tracing::debug!("Registered nodes: {:?}", state.store.ids());
        }
        Ok(UpsertOutcome::Refreshed(record)) => {
            tracing::debug!("Heartbeat from node {} ({})", record.id, record.name);
        }
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorBody::new(e.to_string()))).into_response();
        }
    }

    (StatusCode::OK, Json(RegisterAck::registered(node_id))).into_response()
}

/// Records that are alive right now, whether or not the sweeper has run.
fn alive_peers(state: &AppState) -> Vec<PeerRecord> {
    let now = state.store.now();
    state
        .store
        .snapshot()
        .into_iter()
        .filter(|r| is_alive(r.last_heartbeat, now, state.heartbeat_timeout))
        .collect()
}

/// Handler for `GET /api/cameras`
///
/// Lists every node that is alive right now, keyed by id. Nodes past the
/// heartbeat timeout are hidden even if the sweeper has not removed them yet.
pub async fn cameras(State(state): State<Arc<AppState>>) -> Json<BTreeMap<String, CameraView>> {
    let cameras = alive_peers(&state)
        .iter()
        .map(|r| (r.id.clone(), CameraView::from(r)))
        .collect();
    Json(cameras)
}

/// Handler for `GET /api/health`
///
/// Counts the same nodes `GET /api/cameras` lists.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<ServerHealth> {
    Json(ServerHealth {
        status: "ok",
        cameras: alive_peers(&state).len(),
    })
}
