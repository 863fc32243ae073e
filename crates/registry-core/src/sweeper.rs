//! Eviction of nodes whose heartbeat has expired.
//!
//! Eviction is immediate and unconditional once `is_alive` turns false: no grace
//! period, no warning state. A node that comes back re-registers from scratch.

use crate::liveness::is_alive;
use crate::peer::PeerRecord;
use crate::store::PeerStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Removes stale peers from the store on a fixed cycle.
pub struct EvictionSweeper {
    store: Arc<PeerStore>,
    timeout: Duration,
    cycle_interval: Duration,
}

impl EvictionSweeper {
    pub fn new(store: Arc<PeerStore>, timeout: Duration, cycle_interval: Duration) -> Self {
        Self {
            store,
            timeout,
            cycle_interval,
        }
    }

    /// Evict every peer that is not alive at `now_ms`. Returns the evicted records.
    ///
    /// Candidates come from a snapshot; each removal re-checks liveness under the
    /// lock so a heartbeat that lands in between keeps the peer.
    pub fn sweep(&self, now_ms: u64) -> Vec<PeerRecord> {
        let stale: Vec<String> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|r| !is_alive(r.last_heartbeat, now_ms, self.timeout))
            .map(|r| r.id)
            .collect();

        let mut evicted = Vec::with_capacity(stale.len());
        for id in stale {
            let removed = self
                .store
                .remove_if(&id, |r| !is_alive(r.last_heartbeat, now_ms, self.timeout));
            if let Some(record) = removed {
                info!(
                    "Node {} ({}) timed out after {}ms without heartbeat",
                    record.id,
                    record.name,
                    now_ms.saturating_sub(record.last_heartbeat)
                );
                evicted.push(record);
            }
        }

        if !evicted.is_empty() {
            debug!("Registered nodes after sweep: {:?}", self.store.ids());
        }

        evicted
    }

    /// Sweep forever on a fixed cycle. Never returns.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Eviction sweeper started (timeout {:?}, cycle {:?})",
            self.timeout, self.cycle_interval
        );

        loop {
            ticker.tick().await;
            let now = self.store.now();
            self.sweep(now);
        }
    }
}
