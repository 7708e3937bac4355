//! Snapshot store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ReplicaError;

/// A durable, versioned serialization of a reduced state.
///
/// Snapshots are superseded, never mutated; pruning of old ones is an
/// operational concern outside this crate.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Partition the snapshotted state was reduced from.
    pub partition_key: String,
    /// Sequence number the state reflects.
    pub sequence_number: i64,
    /// Serialized snapshot envelope.
    pub payload: Vec<u8>,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
}

/// Durable storage for snapshots, keyed by partition and sequence number.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Loads the snapshot with the highest sequence number for a partition,
    /// or `None` if no snapshot exists yet.
    ///
    /// # Errors
    ///
    /// Returns `Bootstrap` if the store cannot be read.
    async fn load_latest(&self, partition_key: &str) -> Result<Option<Snapshot>, ReplicaError>;

    /// Persists a snapshot.
    ///
    /// Implementations must refuse to store a snapshot whose sequence number
    /// is not strictly greater than the latest one currently present, so a
    /// slow concurrent writer can never clobber newer state.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotWrite` on I/O failure or a non-monotonic write.
    async fn store(&self, snapshot: Snapshot) -> Result<(), ReplicaError>;
}
