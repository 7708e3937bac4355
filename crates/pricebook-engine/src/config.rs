//! Engine and scheduler configuration.

use std::time::Duration;

/// What to do when a record's payload fails to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedEventPolicy {
    /// Stop consuming and mark the engine unhealthy. The default: a replica
    /// silently diverging from the log is worse than one that stops.
    #[default]
    FailFast,
    /// Log the record, advance the cursor past it, and keep consuming.
    SkipAndLog,
}

/// Configuration for one replication engine instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Partition this instance replicates.
    pub partition_key: String,
    /// First delay after a transport disconnect.
    pub resubscribe_backoff_initial: Duration,
    /// Ceiling for the exponential resubscribe backoff.
    pub resubscribe_backoff_max: Duration,
    /// Maximum records requested from the archive per call during catch-up.
    pub archive_chunk_size: i64,
    /// Attempts for startup-time collaborator calls before failing bootstrap.
    pub startup_attempts: u32,
    /// Handling of undecodable payloads.
    pub malformed_event_policy: MalformedEventPolicy,
}

impl EngineConfig {
    /// Creates a configuration with production defaults for a partition.
    #[must_use]
    pub fn new(partition_key: &str) -> Self {
        Self {
            partition_key: partition_key.to_owned(),
            resubscribe_backoff_initial: Duration::from_millis(200),
            resubscribe_backoff_max: Duration::from_secs(30),
            archive_chunk_size: 1_000,
            startup_attempts: 5,
            malformed_event_policy: MalformedEventPolicy::FailFast,
        }
    }
}

/// Cadence policy for the snapshot scheduler.
#[derive(Debug, Clone)]
pub struct SnapshotPolicy {
    /// How often the scheduler wakes up to evaluate its triggers.
    pub check_period: Duration,
    /// Minimum wall-clock time between persisted snapshots.
    pub min_interval: Duration,
    /// Applied-event count that makes a snapshot due regardless of time.
    pub event_count_threshold: u64,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        Self {
            check_period: Duration::from_secs(5),
            min_interval: Duration::from_secs(300),
            event_count_threshold: 1_000,
        }
    }
}
