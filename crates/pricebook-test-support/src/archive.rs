//! Scripted capture archive for catch-up tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use pricebook_core::archive::ArchiveReader;
use pricebook_core::error::ReplicaError;
use pricebook_core::event::LogRecord;

/// An archive holding an explicit set of records, with optional holes.
///
/// Requested ranges are recorded so tests can assert what the engine asked
/// for (including that it asked for nothing at all).
#[derive(Debug, Default)]
pub struct ScriptedArchive {
    records: Mutex<BTreeMap<i64, LogRecord>>,
    requested: Mutex<Vec<(i64, i64)>>,
}

impl ScriptedArchive {
    /// Creates an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record to the archive.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn insert(&self, record: LogRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.sequence_number, record);
    }

    /// Removes a sequence number, creating a hole.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn remove(&self, sequence: i64) {
        self.records.lock().unwrap().remove(&sequence);
    }

    /// Every range requested via `read_range` so far.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn requested_ranges(&self) -> Vec<(i64, i64)> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveReader for ScriptedArchive {
    async fn read_range(
        &self,
        partition_key: &str,
        from_sequence: i64,
        to_sequence: i64,
    ) -> Result<Vec<LogRecord>, ReplicaError> {
        self.requested
            .lock()
            .unwrap()
            .push((from_sequence, to_sequence));
        let records = self.records.lock().unwrap();
        let mut out = Vec::new();
        for sequence in from_sequence..to_sequence {
            match records.get(&sequence) {
                Some(record) => out.push(record.clone()),
                None => {
                    return Err(ReplicaError::RangeUnavailable {
                        partition: partition_key.to_owned(),
                        from: from_sequence,
                        to: to_sequence,
                    });
                }
            }
        }
        Ok(out)
    }
}
