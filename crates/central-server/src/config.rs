//! Server configuration, read from the environment (flags override).

use clap::Parser;
use registry_core::ProbeConfig;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Heartbeat interval the camera nodes use by default.
pub const DEFAULT_NODE_HEARTBEAT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("Invalid bind address {0}")]
    InvalidAddress(String),
}

#[derive(Parser, Debug, Clone)]
#[command(name = "central-server")]
#[command(about = "Camera node registry with heartbeat eviction and health probing")]
pub struct ServerConfig {
    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0", env = "SERVER_BIND")]
    pub bind: String,

    /// Port to listen on
    #[arg(long, default_value_t = 5001, env = "SERVER_PORT")]
    pub port: u16,

    /// Seconds without a heartbeat before a node is evicted
    #[arg(long, default_value_t = 60, env = "HEARTBEAT_TIMEOUT_SECS")]
    pub heartbeat_timeout_secs: u64,

    /// Seconds between eviction sweeps
    #[arg(long, default_value_t = 10, env = "SWEEP_INTERVAL_SECS")]
    pub sweep_interval_secs: u64,

    /// Seconds between health prober wake-ups
    #[arg(long, default_value_t = 10, env = "PROBE_CYCLE_SECS")]
    pub probe_cycle_secs: u64,

    /// Minimum seconds between two probes of the same node
    #[arg(long, default_value_t = 30, env = "PROBE_INTERVAL_SECS")]
    pub probe_interval_secs: u64,

    /// Timeout for a single health probe, in seconds
    #[arg(long, default_value_t = 2, env = "PROBE_TIMEOUT_SECS")]
    pub probe_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5001,
            heartbeat_timeout_secs: 60,
            sweep_interval_secs: 10,
            probe_cycle_secs: 10,
            probe_interval_secs: 30,
            probe_timeout_secs: 2,
        }
    }
}

impl ServerConfig {
    /// Reject settings the background loops cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("HEARTBEAT_TIMEOUT_SECS", self.heartbeat_timeout_secs),
            ("SWEEP_INTERVAL_SECS", self.sweep_interval_secs),
            ("PROBE_CYCLE_SECS", self.probe_cycle_secs),
            ("PROBE_TIMEOUT_SECS", self.probe_timeout_secs),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        self.socket_addr()?;

        if self.heartbeat_timeout() < DEFAULT_NODE_HEARTBEAT * 3 {
            tracing::warn!(
                "Heartbeat timeout {:?} is under 3x the default node heartbeat ({:?}); \
                 nodes may be evicted after a single missed beat",
                self.heartbeat_timeout(),
                DEFAULT_NODE_HEARTBEAT
            );
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            cycle_interval: Duration::from_secs(self.probe_cycle_secs),
            probe_interval: Duration::from_secs(self.probe_interval_secs),
        }
    }
}
