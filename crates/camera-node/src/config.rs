//! Node configuration, read from the environment (flags override).

use clap::Parser;
use registry_core::Resolution;
use std::time::Duration;
use thiserror::Error;

use crate::backoff::BackoffConfig;
use crate::node::NodeIdentity;
use crate::registration::ClientConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("BACKOFF_MAX_SECS ({max}) must not be below BACKOFF_BASE_SECS ({base})")]
    MaxBelowBase { base: u64, max: u64 },
}

#[derive(Parser, Debug, Clone)]
#[command(name = "camera-node")]
#[command(about = "Camera node agent that registers with the central server")]
pub struct NodeConfig {
    /// Base URL of the central server
    #[arg(long, default_value = "http://192.168.179.200:5001", env = "CENTRAL_SERVER")]
    pub central_server: String,

    /// Address to bind the node API to
    #[arg(long, default_value = "0.0.0.0", env = "NODE_BIND")]
    pub bind: String,

    /// Port of the node API
    #[arg(long, default_value_t = 8000, env = "API_PORT")]
    pub api_port: u16,

    /// Display name (defaults to camera-<hostname>)
    #[arg(long, env = "CAMERA_NODE_NAME")]
    pub node_name: Option<String>,

    /// Node ID (generated if not provided)
    #[arg(long, env = "CAMERA_NODE_ID")]
    pub node_id: Option<String>,

    /// Address to announce instead of the discovered one
    #[arg(long, env = "NODE_IP")]
    pub node_ip: Option<String>,

    /// Declared capture resolution, WIDTHxHEIGHT
    #[arg(long, default_value = "1280x720", env = "CAMERA_RESOLUTION")]
    pub resolution: Resolution,

    /// Seconds between heartbeats while registered
    #[arg(long, default_value_t = 30, env = "HEARTBEAT_INTERVAL_SECS")]
    pub heartbeat_interval_secs: u64,

    /// Delay after the first failed registration, in seconds
    #[arg(long, default_value_t = 5, env = "BACKOFF_BASE_SECS")]
    pub backoff_base_secs: u64,

    /// Upper bound for the retry delay, in seconds
    #[arg(long, default_value_t = 60, env = "BACKOFF_MAX_SECS")]
    pub backoff_max_secs: u64,

    /// Timeout for a single registration request, in seconds
    #[arg(long, default_value_t = 10, env = "REGISTER_TIMEOUT_SECS")]
    pub register_timeout_secs: u64,
}

impl NodeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("HEARTBEAT_INTERVAL_SECS", self.heartbeat_interval_secs),
            ("BACKOFF_BASE_SECS", self.backoff_base_secs),
            ("REGISTER_TIMEOUT_SECS", self.register_timeout_secs),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        if self.backoff_max_secs < self.backoff_base_secs {
            return Err(ConfigError::MaxBelowBase {
                base: self.backoff_base_secs,
                max: self.backoff_max_secs,
            });
        }
        Ok(())
    }

    pub fn register_timeout(&self) -> Duration {
        Duration::from_secs(self.register_timeout_secs)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            heartbeat_interval: Duration::from_secs(self.heartbeat_interval_secs),
            backoff: BackoffConfig {
                base_delay: Duration::from_secs(self.backoff_base_secs),
                max_delay: Duration::from_secs(self.backoff_max_secs),
                ..Default::default()
            },
        }
    }

    /// Resolve the node's identity, generating what was not configured.
    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity {
            id: self
                .node_id
                .clone()
                .filter(|id| !id.is_empty())
                .unwrap_or_else(NodeIdentity::generate_id),
            name: self
                .node_name
                .clone()
                .unwrap_or_else(NodeIdentity::default_name),
            port: self.api_port,
            resolution: self.resolution,
            ip_override: self.node_ip.clone().filter(|ip| !ip.is_empty()),
        }
    }
}
