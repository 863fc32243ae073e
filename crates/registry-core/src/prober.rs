//! Active health probing of registered nodes.
//!
//! Each cycle:
//! 1. Snapshot the peers whose `last_checked` is older than the probe interval
//! 2. Probe each one outside the store lock, one at a time
//! 3. Re-take the lock once and write back status + `last_checked`
//!
//! The prober never removes records; that is the sweeper's job.

use crate::peer::{PeerAddress, PeerRecord, PeerStatus};
use crate::store::PeerStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Why a probe did not get a healthy answer.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Peer answered with a failure status
    #[error("Peer reported failure: HTTP {0}")]
    Unhealthy(u16),

    /// Peer could not be reached (timeout, refused, DNS)
    #[error("Peer unreachable: {0}")]
    Unreachable(String),
}

/// Result of one probe, mapped onto `PeerStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    Unhealthy,
    Unreachable,
}

impl ProbeOutcome {
    pub fn status(&self) -> PeerStatus {
        match self {
            ProbeOutcome::Healthy => PeerStatus::Running,
            ProbeOutcome::Unhealthy => PeerStatus::Error,
            ProbeOutcome::Unreachable => PeerStatus::Unreachable,
        }
    }
}

impl From<&Result<(), ProbeError>> for ProbeOutcome {
    fn from(result: &Result<(), ProbeError>) -> Self {
        match result {
            Ok(()) => ProbeOutcome::Healthy,
            Err(ProbeError::Unhealthy(_)) => ProbeOutcome::Unhealthy,
            Err(ProbeError::Unreachable(_)) => ProbeOutcome::Unreachable,
        }
    }
}

/// Liveness request toward a node. Implementations must bound their own duration.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, address: &PeerAddress) -> Result<(), ProbeError>;
}

#[async_trait]
impl<T: HealthCheck + ?Sized> HealthCheck for Arc<T> {
    async fn check(&self, address: &PeerAddress) -> Result<(), ProbeError> {
        self.as_ref().check(address).await
    }
}

/// Configuration for health probing.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// How often the prober wakes up (default: 10s)
    pub cycle_interval: Duration,
    /// Minimum spacing between probes of the same peer (default: 30s)
    pub probe_interval: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            cycle_interval: Duration::from_secs(10),
            probe_interval: Duration::from_secs(30),
        }
    }
}

/// Periodically probes every known peer and records the outcome.
pub struct HealthProber<H> {
    store: Arc<PeerStore>,
    check: H,
    config: ProbeConfig,
}

impl<H: HealthCheck> HealthProber<H> {
    pub fn new(store: Arc<PeerStore>, check: H, config: ProbeConfig) -> Self {
        Self {
            store,
            check,
            config,
        }
    }

    fn is_due(&self, record: &PeerRecord, now_ms: u64) -> bool {
        match record.last_checked {
            None => true,
            Some(checked) => {
                (now_ms.saturating_sub(checked) as u128) > self.config.probe_interval.as_millis()
            }
        }
    }

    /// Run one probe cycle at `now_ms`. Returns the outcome per probed peer id.
    ///
    /// Peers without an announced address are marked unreachable without a request.
    pub async fn probe_cycle(&self, now_ms: u64) -> HashMap<String, ProbeOutcome> {
        let due: Vec<(String, Option<PeerAddress>)> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|r| self.is_due(r, now_ms))
            .map(|r| {
                let address = r.address();
                (r.id, address)
            })
            .collect();

        let mut outcomes = HashMap::with_capacity(due.len());
        for (id, address) in due {
            let outcome = match address {
                Some(address) => {
                    let result = self.check.check(&address).await;
                    if let Err(e) = &result {
                        debug!("Probe of {} at {} failed: {}", id, address.base_url(), e);
                    }
                    ProbeOutcome::from(&result)
                }
                None => {
                    debug!("Peer {} has no address to probe", id);
                    ProbeOutcome::Unreachable
                }
            };
            outcomes.insert(id, outcome);
        }

        if outcomes.is_empty() {
            return outcomes;
        }

        self.store.for_each(|record| {
            if let Some(outcome) = outcomes.get(&record.id) {
                let status = outcome.status();
                if record.status != status {
                    info!(
                        "Peer {} ({}) status {} -> {}",
                        record.id, record.name, record.status, status
                    );
                }
                record.status = status;
                record.last_checked = Some(now_ms);
            }
        });

        outcomes
    }

    /// Probe forever on a fixed cycle. Never returns.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.config.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "Health prober started (cycle {:?}, per-peer interval {:?})",
            self.config.cycle_interval, self.config.probe_interval
        );

        loop {
            ticker.tick().await;
            let now = self.store.now();
            let outcomes = self.probe_cycle(now).await;
            if !outcomes.is_empty() {
                debug!("Probed {} peer(s)", outcomes.len());
            }
        }
    }
}
