//! Heartbeat freshness.
//!
//! Shared by the eviction sweeper and the camera listing so both agree on what "alive" means.

use std::time::Duration;

/// Returns true while `now - last_heartbeat < timeout`.
///
/// A heartbeat stamped in the future (relative to `now`) counts as fresh.
pub fn is_alive(last_heartbeat_ms: u64, now_ms: u64, timeout: Duration) -> bool {
    let age = now_ms.saturating_sub(last_heartbeat_ms);
    (age as u128) < timeout.as_millis()
}
