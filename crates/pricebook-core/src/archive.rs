//! Capture archive abstraction.
//!
//! An external capture process drains expired records from the live log into
//! cold storage on its own cadence. The engine reads that store during
//! catch-up, and only ever as contiguous ranges.

use async_trait::async_trait;

use crate::error::ReplicaError;
use crate::event::LogRecord;

/// Read-only access to archived log records.
#[async_trait]
pub trait ArchiveReader: Send + Sync {
    /// Reads the contiguous range `[from_sequence, to_sequence)` for one
    /// partition, in strictly increasing sequence order.
    ///
    /// The call is restartable: after a partial failure the same range can be
    /// requested again.
    ///
    /// # Errors
    ///
    /// Returns `RangeUnavailable` if any sub-range is missing from the
    /// archive. A truncated result is never returned; callers can always
    /// distinguish "fully satisfied" from "not satisfiable".
    async fn read_range(
        &self,
        partition_key: &str,
        from_sequence: i64,
        to_sequence: i64,
    ) -> Result<Vec<LogRecord>, ReplicaError>;
}
