//! Snapshot store fakes.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use pricebook_core::error::ReplicaError;
use pricebook_core::snapshot::{Snapshot, SnapshotStore};

/// An in-memory snapshot store with failure injection.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Mutex<BTreeMap<i64, Snapshot>>,
    fail_next_stores: Mutex<u32>,
}

impl InMemorySnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-loads a snapshot, bypassing the monotonic-write guard.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn seed(&self, snapshot: Snapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(snapshot.sequence_number, snapshot);
    }

    /// Makes the next `count` calls to `store` fail.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn fail_next_stores(&self, count: u32) {
        *self.fail_next_stores.lock().unwrap() = count;
    }

    /// Deletes everything, as an external snapshot-pruner would.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn delete_all(&self) {
        self.snapshots.lock().unwrap().clear();
    }

    /// The highest stored sequence number, if any.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn latest_sequence(&self) -> Option<i64> {
        self.snapshots
            .lock()
            .unwrap()
            .keys()
            .next_back()
            .copied()
    }

    /// Number of snapshots currently stored.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn stored_count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load_latest(&self, _partition_key: &str) -> Result<Option<Snapshot>, ReplicaError> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .values()
            .next_back()
            .cloned())
    }

    async fn store(&self, snapshot: Snapshot) -> Result<(), ReplicaError> {
        {
            let mut failures = self.fail_next_stores.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(ReplicaError::SnapshotWrite(
                    "injected store failure".to_owned(),
                ));
            }
        }
        let mut snapshots = self.snapshots.lock().unwrap();
        if let Some(latest) = snapshots.keys().next_back().copied()
            && snapshot.sequence_number <= latest
        {
            return Err(ReplicaError::SnapshotWrite(format!(
                "sequence {} is not newer than stored sequence {latest}",
                snapshot.sequence_number
            )));
        }
        snapshots.insert(snapshot.sequence_number, snapshot);
        Ok(())
    }
}

/// A snapshot store that always fails, for bootstrap error paths.
#[derive(Debug)]
pub struct FailingSnapshotStore;

#[async_trait]
impl SnapshotStore for FailingSnapshotStore {
    async fn load_latest(&self, _partition_key: &str) -> Result<Option<Snapshot>, ReplicaError> {
        Err(ReplicaError::Bootstrap("snapshot store unreachable".to_owned()))
    }

    async fn store(&self, _snapshot: Snapshot) -> Result<(), ReplicaError> {
        Err(ReplicaError::SnapshotWrite("snapshot store unreachable".to_owned()))
    }
}
