//! camera-node: Agent that keeps a camera node registered with the central server.
//!
//! Serves `GET /api/health` and `GET /api/info` for the central prober and runs
//! a `RegistrationClient` that heartbeats every 30s, backing off exponentially
//! while the server is unreachable.

pub mod backoff;
pub mod config;
pub mod node;
pub mod registration;

pub use backoff::{calculate_backoff, BackoffConfig, RetryState};
pub use config::{ConfigError, NodeConfig};
pub use node::{router, NodeIdentity, NodeState};
pub use registration::{
    AnnounceError, Announcer, ClientConfig, ClientPhase, HttpAnnouncer, RegistrationClient,
};
