//! registry-core: Node registry and liveness management for the camera network.
//!
//! This crate provides the pieces shared by the central server and the camera nodes:
//! - `PeerStore`: the lock-guarded map of registered nodes
//! - `is_alive`: the single definition of heartbeat freshness
//! - `HealthProber` / `EvictionSweeper`: the server's background loops
//! - JSON wire types for registration, listing and health checks
//!
//! Network access lives behind the `HealthCheck` trait so the core stays transport-agnostic.

pub mod clock;
pub mod liveness;
pub mod peer;
pub mod prober;
pub mod protocol;
pub mod store;
pub mod sweeper;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use liveness::is_alive;
pub use peer::{PeerAddress, PeerRecord, PeerStatus, PeerUpdate, Resolution, ResolutionError};
pub use prober::{HealthCheck, HealthProber, ProbeConfig, ProbeError, ProbeOutcome};
pub use protocol::{Announcement, CameraView, ErrorBody, NodeHealth, RegisterAck};
pub use store::{PeerStore, StoreError, UpsertOutcome};
pub use sweeper::EvictionSweeper;
