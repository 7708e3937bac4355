//! Live log abstractions.
//!
//! The partitioned log service itself (its wire protocol, client library,
//! broker topology) is an external collaborator. The engine only depends on
//! these two traits: a retention-floor query and a tailing subscription with
//! at-least-once delivery.

use async_trait::async_trait;

use crate::error::ReplicaError;
use crate::event::LogRecord;

/// Read access to one partition of the live log service.
#[async_trait]
pub trait LogReader: Send + Sync {
    /// Returns the oldest sequence number still retained in the partition.
    ///
    /// This is the first sequence a fresh subscription can deliver; it
    /// advances over time as retention expires old records. A partition that
    /// has never expired anything reports `0`.
    ///
    /// # Errors
    ///
    /// Returns `TransientTransport` if the log service is unreachable.
    async fn oldest_available_sequence(&self, partition_key: &str) -> Result<i64, ReplicaError>;

    /// Opens a tailing subscription positioned at `from_sequence`.
    ///
    /// # Errors
    ///
    /// Returns `TransientTransport` if the subscription cannot be opened.
    async fn subscribe(
        &self,
        partition_key: &str,
        from_sequence: i64,
    ) -> Result<Box<dyn LogSubscription>, ReplicaError>;
}

/// A long-lived tailing subscription on one partition.
///
/// Delivery is at-least-once: duplicates are possible after broker-side
/// retries and must be absorbed by the consumer.
#[async_trait]
pub trait LogSubscription: Send {
    /// Waits for the next record, suspending the calling task until one
    /// arrives.
    ///
    /// # Errors
    ///
    /// Returns `TransientTransport` on disconnect or timeout. A subscription
    /// never ends silently; every termination is an explicit error so the
    /// consumer can decide to resubscribe.
    async fn next_record(&mut self) -> Result<LogRecord, ReplicaError>;

    /// Cancels the subscription and releases its transport resources.
    /// Idempotent.
    async fn close(&mut self);
}
