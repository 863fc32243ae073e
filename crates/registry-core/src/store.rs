//! Peer record store.
//!
//! A single `Mutex` guards the whole map, so readers never see a half-applied
//! registration.
//! Wrap in `Arc` for shared ownership.

use crate::clock::Clock;
use crate::peer::{PeerRecord, PeerUpdate};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Node ID is required")]
    EmptyId,
}

/// Result of an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First registration for this id
    Created(PeerRecord),
    /// Existing record refreshed
    Refreshed(PeerRecord),
}

impl UpsertOutcome {
    pub fn record(&self) -> &PeerRecord {
        match self {
            UpsertOutcome::Created(r) | UpsertOutcome::Refreshed(r) => r,
        }
    }

    pub fn into_record(self) -> PeerRecord {
        match self {
            UpsertOutcome::Created(r) | UpsertOutcome::Refreshed(r) => r,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, UpsertOutcome::Created(_))
    }
}

/// In-memory map from node id to peer record.
pub struct PeerStore {
    peers: Mutex<HashMap<String, PeerRecord>>,
    clock: Arc<dyn Clock>,
}

impl PeerStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Current time from the store's clock.
    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PeerRecord>> {
        self.peers.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Merge `update` into the record for `id` (creating it if absent) and stamp
    /// `last_heartbeat` with server time.
    ///
    /// The stamp never goes backwards for a given id: a refresh within the same
    /// millisecond lands one millisecond after the previous stamp, so stamp order
    /// matches lock order.
    pub fn upsert(&self, id: &str, update: &PeerUpdate) -> Result<UpsertOutcome, StoreError> {
        if id.is_empty() {
            return Err(StoreError::EmptyId);
        }

        let mut peers = self.lock();
        let now = self.clock.now_ms();

        if let Some(record) = peers.get_mut(id) {
            record.apply(update);
            record.last_heartbeat = now.max(record.last_heartbeat + 1);
            Ok(UpsertOutcome::Refreshed(record.clone()))
        } else {
            let mut record = PeerRecord::new(id.to_string(), now);
            record.apply(update);
            peers.insert(id.to_string(), record.clone());
            Ok(UpsertOutcome::Created(record))
        }
    }

    /// Owned copy of every record.
    pub fn snapshot(&self) -> Vec<PeerRecord> {
        self.lock().values().cloned().collect()
    }

    /// Delete a record. Returns the removed record, `None` if it was not present.
    pub fn remove(&self, id: &str) -> Option<PeerRecord> {
        self.lock().remove(id)
    }

    /// Delete a record only if `pred` holds for it at removal time.
    pub fn remove_if(&self, id: &str, pred: impl FnOnce(&PeerRecord) -> bool) -> Option<PeerRecord> {
        let mut peers = self.lock();
        if peers.get(id).is_some_and(pred) {
            peers.remove(id)
        } else {
            None
        }
    }

    /// Apply `f` to every record while holding the lock.
    pub fn for_each(&self, mut f: impl FnMut(&mut PeerRecord)) {
        let mut peers = self.lock();
        for record in peers.values_mut() {
            f(record);
        }
    }

    pub fn get(&self, id: &str) -> Option<PeerRecord> {
        self.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Ids currently registered (sorted, for stable logs).
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::peer::PeerStatus;
    use std::sync::Barrier;
    use std::thread;

    fn store_at(start_ms: u64) -> (PeerStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start_ms));
        (PeerStore::new(clock.clone()), clock)
    }

    // ==================== upsert ====================

    #[test]
    fn test_upsert_creates_record() {
        let (store, _clock) = store_at(1000);

        let outcome = store
            .upsert("cam1", &PeerUpdate::default().with_name("front"))
            .unwrap();

        assert!(outcome.is_created());
        let record = store.get("cam1").unwrap();
        assert_eq!(record.name, "front");
        assert_eq!(record.status, PeerStatus::Initializing);
        assert_eq!(record.last_heartbeat, 1000);
        assert!(record.last_checked.is_none());
    }

    #[test]
    fn test_upsert_merges_existing_record() {
        let (store, clock) = store_at(1000);
        store
            .upsert(
                "cam1",
                &PeerUpdate::default()
                    .with_name("front")
                    .with_address("10.0.0.5", 8000),
            )
            .unwrap();

        clock.advance(5000);
        let outcome = store
            .upsert("cam1", &PeerUpdate::default().with_status(PeerStatus::Running))
            .unwrap();

        assert!(!outcome.is_created());
        let record = outcome.into_record();
        assert_eq!(record.name, "front");
        assert_eq!(record.ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(record.status, PeerStatus::Running);
        assert_eq!(record.last_heartbeat, 6000);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_upsert_is_idempotent_except_heartbeat() {
        let (store, _clock) = store_at(1000);
        let update = PeerUpdate::default()
            .with_name("front")
            .with_address("10.0.0.5", 8000);

        let first = store.upsert("cam1", &update).unwrap().into_record();
        let second = store.upsert("cam1", &update).unwrap().into_record();

        assert!(second.last_heartbeat > first.last_heartbeat);
        assert_eq!(
            PeerRecord {
                last_heartbeat: 0,
                ..first
            },
            PeerRecord {
                last_heartbeat: 0,
                ..second
            }
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_upsert_empty_id_returns_error() {
        let (store, _clock) = store_at(1000);

        let result = store.upsert("", &PeerUpdate::default().with_name("ghost"));

        assert_eq!(result.unwrap_err(), StoreError::EmptyId);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_upserts_same_id_merge() {
        let (store, _clock) = store_at(1000);
        let store = Arc::new(store);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = ["left", "right"]
            .into_iter()
            .map(|name| {
                let store = store.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .upsert("cam1", &PeerUpdate::default().with_name(name))
                        .unwrap()
                        .into_record()
                })
            })
            .collect();

        let written: Vec<PeerRecord> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(store.len(), 1);
        let latest = written.iter().max_by_key(|r| r.last_heartbeat).unwrap();
        let final_record = store.get("cam1").unwrap();
        assert_eq!(final_record.name, latest.name);
        assert_eq!(final_record.last_heartbeat, latest.last_heartbeat);
        assert_ne!(written[0].last_heartbeat, written[1].last_heartbeat);
    }

    // ==================== snapshot / remove / for_each ====================

    #[test]
    fn test_snapshot_is_a_copy() {
        let (store, _clock) = store_at(1000);
        store.upsert("cam1", &PeerUpdate::default()).unwrap();

        let mut snapshot = store.snapshot();
        snapshot[0].name = "changed".into();

        assert_eq!(store.get("cam1").unwrap().name, "");
    }

    #[test]
    fn test_remove_present_and_absent() {
        let (store, _clock) = store_at(1000);
        store.upsert("cam1", &PeerUpdate::default()).unwrap();

        assert!(store.remove("cam1").is_some());
        assert!(store.remove("cam1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_if_checks_predicate_under_lock() {
        let (store, _clock) = store_at(1000);
        store.upsert("cam1", &PeerUpdate::default()).unwrap();

        assert!(store.remove_if("cam1", |r| r.last_heartbeat < 1000).is_none());
        assert_eq!(store.len(), 1);

        assert!(store.remove_if("cam1", |r| r.last_heartbeat == 1000).is_some());
        assert!(store.is_empty());
        assert!(store.remove_if("missing", |_| true).is_none());
    }

    #[test]
    fn test_for_each_mutates_all_records() {
        let (store, _clock) = store_at(1000);
        store.upsert("cam1", &PeerUpdate::default()).unwrap();
        store.upsert("cam2", &PeerUpdate::default()).unwrap();

        store.for_each(|r| {
            r.status = PeerStatus::Unreachable;
            r.last_checked = Some(2000);
        });

        for record in store.snapshot() {
            assert_eq!(record.status, PeerStatus::Unreachable);
            assert_eq!(record.last_checked, Some(2000));
        }
    }

    #[test]
    fn test_ids_sorted() {
        let (store, _clock) = store_at(1000);
        store.upsert("cam2", &PeerUpdate::default()).unwrap();
        store.upsert("cam1", &PeerUpdate::default()).unwrap();

        assert_eq!(store.ids(), vec!["cam1".to_string(), "cam2".to_string()]);
    }
}
