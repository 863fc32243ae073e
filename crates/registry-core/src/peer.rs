//! Peer records tracked by the registry.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// Advisory status of a camera node.
///
/// Used for presentation only; liveness is decided from heartbeats.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PeerStatus {
    /// Node announced itself but its camera is not up yet
    #[default]
    Initializing,
    /// Node answered its health check
    Running,
    /// Node is reachable but reported a failure
    Error,
    /// Health check could not reach the node at all
    Unreachable,
}

impl PeerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerStatus::Initializing => "initializing",
            PeerStatus::Running => "running",
            PeerStatus::Error => "error",
            PeerStatus::Unreachable => "unreachable",
        }
    }
}

impl Display for PeerStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Invalid resolution '{0}': expected WIDTHxHEIGHT")]
    InvalidFormat(String),
}

/// Declared capture dimensions, `[width, height]` on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resolution(pub u32, pub u32);

impl Default for Resolution {
    fn default() -> Self {
        Self(1280, 720)
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.0, self.1)
    }
}

impl FromStr for Resolution {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ResolutionError::InvalidFormat(s.to_string());
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let w = w.trim().parse().map_err(|_| invalid())?;
        let h = h.trim().parse().map_err(|_| invalid())?;
        Ok(Self(w, h))
    }
}

/// Where a node's capture API can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddress {
    pub ip: String,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self { ip: ip.into(), port }
    }

    /// `http://ip:port`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }

    /// MJPEG stream served by the node.
    pub fn stream_url(&self) -> String {
        format!("{}/stream", self.base_url())
    }
}

/// One registered camera node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    /// Node-assigned identifier, primary key of the store
    pub id: String,
    /// Human-readable label (not unique)
    pub name: String,
    /// Host the node announced (None until it sends one)
    pub ip: Option<String>,
    /// Port of the node's API (None until it sends one)
    pub port: Option<u16>,
    pub status: PeerStatus,
    pub resolution: Option<Resolution>,
    /// Server receipt time of the latest accepted registration (ms since epoch)
    pub last_heartbeat: u64,
    /// Time of the latest health probe attempt (ms since epoch)
    pub last_checked: Option<u64>,
}

impl PeerRecord {
    /// Fresh record with defaults for every field the first announcement omits.
    pub fn new(id: String, last_heartbeat: u64) -> Self {
        Self {
            id,
            name: String::new(),
            ip: None,
            port: None,
            status: PeerStatus::default(),
            resolution: None,
            last_heartbeat,
            last_checked: None,
        }
    }

    /// Complete address, if the node has announced both host and port.
    pub fn address(&self) -> Option<PeerAddress> {
        match (&self.ip, self.port) {
            (Some(ip), Some(port)) => Some(PeerAddress::new(ip.clone(), port)),
            _ => None,
        }
    }

    /// Merge the present fields of `update`; absent fields keep their values.
    pub fn apply(&mut self, update: &PeerUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(ip) = &update.ip {
            self.ip = Some(ip.clone());
        }
        if let Some(port) = update.port {
            self.port = Some(port);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(resolution) = update.resolution {
            self.resolution = Some(resolution);
        }
    }
}

/// Fields carried by a registration; `None` means "not announced".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerUpdate {
    pub name: Option<String>,
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub status: Option<PeerStatus>,
    pub resolution: Option<Resolution>,
}

impl PeerUpdate {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_address(mut self, ip: impl Into<String>, port: u16) -> Self {
        self.ip = Some(ip.into());
        self.port = Some(port);
        self
    }

    pub fn with_status(mut self, status: PeerStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&PeerStatus::Unreachable).unwrap();
        assert_eq!(json, "\"unreachable\"");

        let parsed: PeerStatus = serde_json::from_str("\"running\"").unwrap();
        assert_eq!(parsed, PeerStatus::Running);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!(serde_json::from_str::<PeerStatus>("\"exploded\"").is_err());
    }

    #[test]
    fn test_resolution_wire_shape_is_array() {
        let json = serde_json::to_string(&Resolution(1920, 1080)).unwrap();
        assert_eq!(json, "[1920,1080]");
    }

    #[test]
    fn test_resolution_from_str() {
        assert_eq!("640x480".parse::<Resolution>().unwrap(), Resolution(640, 480));
        assert_eq!(" 1280X720 ".parse::<Resolution>().unwrap(), Resolution(1280, 720));
        assert!("1280".parse::<Resolution>().is_err());
        assert!("wide x tall".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_apply_merges_only_present_fields() {
        let mut record = PeerRecord::new("cam1".into(), 1000);
        record.apply(&PeerUpdate::default().with_name("front").with_address("10.0.0.5", 8000));

        record.apply(&PeerUpdate::default().with_status(PeerStatus::Running));

        assert_eq!(record.name, "front");
        assert_eq!(record.status, PeerStatus::Running);
        assert_eq!(record.address(), Some(PeerAddress::new("10.0.0.5", 8000)));
    }

    #[test]
    fn test_address_requires_ip_and_port() {
        let mut record = PeerRecord::new("cam1".into(), 0);
        record.ip = Some("10.0.0.5".into());
        assert!(record.address().is_none());

        record.port = Some(8000);
        assert_eq!(
            record.address().unwrap().stream_url(),
            "http://10.0.0.5:8000/stream"
        );
    }
}
