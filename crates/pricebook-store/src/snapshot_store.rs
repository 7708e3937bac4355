//! Blob-backed snapshot store client.
//!
//! One blob per snapshot under `snapshots/{partition}/{sequence:020}.json`.
//! Zero-padding makes lexicographic key order equal sequence order, so
//! "latest" is simply the highest key — the single resolution rule every
//! reader of this store agrees on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use pricebook_core::error::ReplicaError;
use pricebook_core::snapshot::{Snapshot, SnapshotStore};

use crate::blob::{BlobError, BlobStore};

/// Durable form of one snapshot blob.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSnapshot {
    sequence_number: i64,
    created_at: DateTime<Utc>,
    envelope: String,
}

/// Snapshot store client over any [`BlobStore`].
#[derive(Debug, Clone)]
pub struct BlobSnapshotStore<B> {
    blobs: B,
}

impl<B: BlobStore> BlobSnapshotStore<B> {
    /// Creates a snapshot store over the given blob backend.
    #[must_use]
    pub fn new(blobs: B) -> Self {
        Self { blobs }
    }

    fn prefix(partition_key: &str) -> String {
        format!("snapshots/{partition_key}/")
    }

    fn key(partition_key: &str, sequence: i64) -> String {
        format!("snapshots/{partition_key}/{sequence:020}.json")
    }

    async fn latest_key(&self, partition_key: &str) -> Result<Option<String>, BlobError> {
        let keys = self.blobs.list(&Self::prefix(partition_key)).await?;
        // Keys are zero-padded, so the lexicographic maximum is the highest
        // sequence; skip anything that does not parse as a snapshot key.
        Ok(keys
            .into_iter()
            .filter(|key| parse_sequence(key).is_some())
            .max())
    }
}

#[async_trait]
impl<B: BlobStore> SnapshotStore for BlobSnapshotStore<B> {
    async fn load_latest(&self, partition_key: &str) -> Result<Option<Snapshot>, ReplicaError> {
        let Some(key) = self
            .latest_key(partition_key)
            .await
            .map_err(|e| ReplicaError::Bootstrap(e.to_string()))?
        else {
            return Ok(None);
        };
        let bytes = match self.blobs.get(&key).await {
            Ok(bytes) => bytes,
            // An external pruner may delete between list and get; treat the
            // partition as having no snapshot rather than failing bootstrap.
            Err(BlobError::NotFound(_)) => {
                debug!(key, "latest snapshot vanished between list and get");
                return Ok(None);
            }
            Err(e) => return Err(ReplicaError::Bootstrap(e.to_string())),
        };
        let stored: StoredSnapshot = serde_json::from_slice(&bytes)
            .map_err(|e| ReplicaError::Bootstrap(format!("snapshot blob {key} undecodable: {e}")))?;
        Ok(Some(Snapshot {
            partition_key: partition_key.to_owned(),
            sequence_number: stored.sequence_number,
            payload: stored.envelope.into_bytes(),
            created_at: stored.created_at,
        }))
    }

    async fn store(&self, snapshot: Snapshot) -> Result<(), ReplicaError> {
        let latest = self
            .latest_key(&snapshot.partition_key)
            .await
            .map_err(|e| ReplicaError::SnapshotWrite(e.to_string()))?
            .and_then(|key| parse_sequence(&key));
        if let Some(latest) = latest
            && snapshot.sequence_number <= latest
        {
            return Err(ReplicaError::SnapshotWrite(format!(
                "sequence {} is not newer than stored sequence {latest}",
                snapshot.sequence_number
            )));
        }

        let envelope = String::from_utf8(snapshot.payload)
            .map_err(|e| ReplicaError::SnapshotWrite(format!("payload is not UTF-8: {e}")))?;
        let stored = StoredSnapshot {
            sequence_number: snapshot.sequence_number,
            created_at: snapshot.created_at,
            envelope,
        };
        let bytes = serde_json::to_vec(&stored)
            .map_err(|e| ReplicaError::SnapshotWrite(e.to_string()))?;
        self.blobs
            .put(
                &Self::key(&snapshot.partition_key, snapshot.sequence_number),
                bytes,
            )
            .await
            .map_err(|e| ReplicaError::SnapshotWrite(e.to_string()))
    }
}

fn parse_sequence(key: &str) -> Option<i64> {
    let file = key.rsplit('/').next()?;
    let stem = file.strip_suffix(".json")?;
    stem.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::parse_sequence;

    #[test]
    fn test_parse_sequence_accepts_padded_keys() {
        assert_eq!(
            parse_sequence("snapshots/pricing-0/00000000000000000409.json"),
            Some(409)
        );
    }

    #[test]
    fn test_parse_sequence_rejects_foreign_keys() {
        assert_eq!(parse_sequence("snapshots/pricing-0/latest.txt"), None);
        assert_eq!(parse_sequence("snapshots/pricing-0/notes.json"), None);
    }
}
