//! Replica error taxonomy.

use thiserror::Error;

/// Top-level error type for the replication core.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// A transport-level disconnect or timeout. Always retried with backoff;
    /// never surfaced to readers of the published state.
    #[error("transient transport failure: {0}")]
    TransientTransport(String),

    /// The archive cannot satisfy a required contiguous range. Fatal to
    /// startup: a true gap needs operator intervention.
    #[error("archive cannot satisfy range [{from}, {to}) for partition {partition}")]
    RangeUnavailable {
        /// Partition the range was requested for.
        partition: String,
        /// First sequence number requested (inclusive).
        from: i64,
        /// End of the requested range (exclusive).
        to: i64,
    },

    /// The live stream delivered a sequence number ahead of expectation.
    /// Indicates a retention-window race or a logic error; fatal.
    #[error("sequence gap on partition {partition}: expected {expected}, received {received}")]
    SequenceGap {
        /// Partition the gap was observed on.
        partition: String,
        /// The sequence number the cursor expected next.
        expected: i64,
        /// The sequence number actually delivered.
        received: i64,
    },

    /// A snapshot could not be persisted. Non-fatal; the scheduler retries
    /// on its next tick.
    #[error("snapshot write failed: {0}")]
    SnapshotWrite(String),

    /// An event payload failed to decode.
    #[error("malformed event at sequence {sequence}: {reason}")]
    MalformedEvent {
        /// Sequence number of the undecodable record.
        sequence: i64,
        /// Decoder failure description.
        reason: String,
    },

    /// Startup could not complete (unreadable snapshot store, corrupt
    /// snapshot, failed floor query after retries).
    #[error("bootstrap failed: {0}")]
    Bootstrap(String),
}

impl ReplicaError {
    /// Returns `true` for errors that are recovered locally via retry rather
    /// than propagated as fatal.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientTransport(_))
    }
}
