//! JSON bodies exchanged between camera nodes and the central server.

use crate::peer::{PeerRecord, PeerStatus, PeerUpdate, Resolution};
use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Format used for `last_seen` in the camera listing.
pub const LAST_SEEN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Body of `POST /api/register`, sent by a node on every heartbeat.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Announcement {
    /// Required; validated by the endpoint rather than by serde so a missing id
    /// gets its own error message.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub status: Option<PeerStatus>,
    #[serde(default)]
    pub resolution: Option<Resolution>,
    /// Node's own clock at send time (seconds since epoch). Informational only.
    #[serde(default)]
    pub last_heartbeat: Option<f64>,
}

impl Announcement {
    /// Non-empty id, if present.
    pub fn node_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Fields to merge into the store. The client timestamp is deliberately dropped.
    pub fn to_update(&self) -> PeerUpdate {
        PeerUpdate {
            name: self.name.clone(),
            ip: self.ip.clone(),
            port: self.port,
            status: self.status,
            resolution: self.resolution,
        }
    }
}

/// `200` response to a registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterAck {
    pub status: String,
    pub id: String,
}

impl RegisterAck {
    pub fn registered(id: impl Into<String>) -> Self {
        Self {
            status: "registered".to_string(),
            id: id.into(),
        }
    }
}

/// Error body for any non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// One entry of `GET /api/cameras`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CameraView {
    pub id: String,
    pub name: String,
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub status: PeerStatus,
    pub resolution: Option<Resolution>,
    pub url: Option<String>,
    pub last_seen: String,
}

impl From<&PeerRecord> for CameraView {
    fn from(record: &PeerRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            ip: record.ip.clone(),
            port: record.port,
            status: record.status,
            resolution: record.resolution,
            url: record.address().map(|a| a.stream_url()),
            last_seen: format_last_seen(record.last_heartbeat),
        }
    }
}

/// Render a millisecond timestamp in local time for display.
pub fn format_last_seen(timestamp_ms: u64) -> String {
    match Local.timestamp_millis_opt(timestamp_ms as i64).single() {
        Some(dt) => dt.format(LAST_SEEN_FORMAT).to_string(),
        None => String::new(),
    }
}

/// Body of a node's `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeHealth {
    pub status: String,
    pub camera: String,
}

impl NodeHealth {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            camera: "running".to_string(),
        }
    }

    pub fn not_running() -> Self {
        Self {
            status: "error".to_string(),
            camera: "not running".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    #[test]
    fn test_announcement_from_node_payload() {
        let json = r#"{
            "id": "a1b2c3d4",
            "name": "camera-pi",
            "ip": "192.168.1.20",
            "port": 8000,
            "status": "running",
            "resolution": [1280, 720],
            "last_heartbeat": 1700000000.25,
            "firmware": "ignored"
        }"#;

        let announcement: Announcement = serde_json::from_str(json).unwrap();

        assert_eq!(announcement.node_id(), Some("a1b2c3d4"));
        let update = announcement.to_update();
        assert_eq!(update.port, Some(8000));
        assert_eq!(update.status, Some(PeerStatus::Running));
        assert_eq!(update.resolution, Some(Resolution(1280, 720)));
    }

    #[test]
    fn test_announcement_missing_or_empty_id() {
        let missing: Announcement = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert_eq!(missing.node_id(), None);

        let empty: Announcement = serde_json::from_str(r#"{"id": ""}"#).unwrap();
        assert_eq!(empty.node_id(), None);
    }

    #[test]
    fn test_camera_view_from_record() {
        let mut record = PeerRecord::new("cam1".into(), 1_700_000_000_000);
        record.name = "front".into();
        record.ip = Some("10.0.0.5".into());
        record.port = Some(8000);

        let view = CameraView::from(&record);

        assert_eq!(view.url.as_deref(), Some("http://10.0.0.5:8000/stream"));
        assert!(NaiveDateTime::parse_from_str(&view.last_seen, LAST_SEEN_FORMAT).is_ok());
    }

    #[test]
    fn test_register_ack_shape() {
        let json = serde_json::to_value(RegisterAck::registered("cam1")).unwrap();
        assert_eq!(json, serde_json::json!({"status": "registered", "id": "cam1"}));
    }
}
