//! Log fakes — an in-memory live log service and a scripted log.
//!
//! `InMemoryLogService` behaves like a single-partition log broker: tests
//! publish payloads, raise the retention floor, and force disconnects while
//! an engine is subscribed. `ScriptedLog` hands out pre-programmed
//! subscriptions so a test can dictate the exact delivery sequence,
//! including duplicates, gaps, and disconnects.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use uuid::Uuid;

use pricebook_core::codec;
use pricebook_core::error::ReplicaError;
use pricebook_core::event::{EventPayload, LogRecord};
use pricebook_core::log::{LogReader, LogSubscription};

/// A single-partition, in-memory log service.
///
/// Sequence numbers equal positions in the backing vector; raising the floor
/// only affects where new subscriptions may start, mirroring a broker whose
/// retention expiry never rewrites history.
#[derive(Debug)]
pub struct InMemoryLogService {
    partition_key: String,
    inner: Arc<Mutex<LogInner>>,
    notify: Arc<Notify>,
}

#[derive(Debug)]
struct LogInner {
    records: Vec<LogRecord>,
    floor: i64,
    epoch: u64,
}

impl InMemoryLogService {
    /// Creates an empty log for one partition.
    #[must_use]
    pub fn new(partition_key: &str) -> Self {
        Self {
            partition_key: partition_key.to_owned(),
            inner: Arc::new(Mutex::new(LogInner {
                records: Vec::new(),
                floor: 0,
                epoch: 0,
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Appends a payload and returns the sequence number it was assigned.
    ///
    /// # Panics
    ///
    /// Panics if the payload fails to encode or the lock is poisoned.
    #[allow(clippy::cast_possible_wrap)]
    pub fn publish(&self, payload: &EventPayload) -> i64 {
        let mut inner = self.inner.lock().unwrap();
        let sequence = inner.records.len() as i64;
        inner.records.push(LogRecord {
            event_id: Uuid::new_v4(),
            partition_key: self.partition_key.clone(),
            sequence_number: sequence,
            payload: codec::encode_payload(payload).unwrap(),
            enqueued_at: Utc::now(),
        });
        drop(inner);
        self.notify.notify_waiters();
        sequence
    }

    /// Raises the retention floor so `sequence` becomes the oldest available.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn expire_below(&self, sequence: i64) {
        self.inner.lock().unwrap().floor = sequence;
    }

    /// Drops every open subscription with a transport error.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn disconnect_all(&self) {
        self.inner.lock().unwrap().epoch += 1;
        self.notify.notify_waiters();
    }

    /// Number of records ever published.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[allow(clippy::cast_possible_wrap)]
    #[must_use]
    pub fn len(&self) -> i64 {
        self.inner.lock().unwrap().records.len() as i64
    }

    /// Whether any record has been published.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().records.is_empty()
    }
}

#[async_trait]
impl LogReader for InMemoryLogService {
    async fn oldest_available_sequence(&self, _partition_key: &str) -> Result<i64, ReplicaError> {
        Ok(self.inner.lock().unwrap().floor)
    }

    async fn subscribe(
        &self,
        _partition_key: &str,
        from_sequence: i64,
    ) -> Result<Box<dyn LogSubscription>, ReplicaError> {
        let inner = self.inner.lock().unwrap();
        // A broker cannot serve below the floor; it starts at the first
        // record still available, which a strict consumer detects as a gap.
        let cursor = from_sequence.max(inner.floor);
        let epoch = inner.epoch;
        drop(inner);
        Ok(Box::new(InMemorySubscription {
            inner: Arc::clone(&self.inner),
            notify: Arc::clone(&self.notify),
            cursor,
            epoch,
            dead: false,
        }))
    }
}

struct InMemorySubscription {
    inner: Arc<Mutex<LogInner>>,
    notify: Arc<Notify>,
    cursor: i64,
    epoch: u64,
    dead: bool,
}

#[async_trait]
impl LogSubscription for InMemorySubscription {
    #[allow(clippy::cast_sign_loss)]
    async fn next_record(&mut self) -> Result<LogRecord, ReplicaError> {
        loop {
            if self.dead {
                return Err(ReplicaError::TransientTransport(
                    "subscription disconnected".to_owned(),
                ));
            }
            let notified = self.notify.notified();
            {
                let inner = self.inner.lock().unwrap();
                if inner.epoch != self.epoch {
                    self.dead = true;
                    return Err(ReplicaError::TransientTransport(
                        "connection reset by broker".to_owned(),
                    ));
                }
                if let Some(record) = inner.records.get(self.cursor as usize) {
                    self.cursor += 1;
                    return Ok(record.clone());
                }
            }
            notified.await;
        }
    }

    async fn close(&mut self) {
        self.dead = true;
    }
}

/// One step of a scripted subscription.
#[derive(Debug)]
pub enum ScriptStep {
    /// Deliver this record.
    Deliver(LogRecord),
    /// Fail with a transient transport error.
    Disconnect(&'static str),
}

/// A log reader that hands out pre-programmed subscriptions.
///
/// Each `subscribe` call consumes the next script; once a script is
/// exhausted, its subscription suspends forever (as a quiet partition
/// would). Subscribe positions are recorded for assertions.
#[derive(Debug)]
pub struct ScriptedLog {
    floor: i64,
    scripts: Mutex<VecDeque<VecDeque<ScriptStep>>>,
    subscribe_positions: Mutex<Vec<i64>>,
    subscribe_count: AtomicU64,
}

impl ScriptedLog {
    /// Creates a scripted log reporting the given retention floor.
    #[must_use]
    pub fn new(floor: i64) -> Self {
        Self {
            floor,
            scripts: Mutex::new(VecDeque::new()),
            subscribe_positions: Mutex::new(Vec::new()),
            subscribe_count: AtomicU64::new(0),
        }
    }

    /// Queues the script for the next `subscribe` call.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn push_script<I>(&self, steps: I)
    where
        I: IntoIterator<Item = ScriptStep>,
    {
        self.scripts
            .lock()
            .unwrap()
            .push_back(steps.into_iter().collect());
    }

    /// The `from_sequence` of every `subscribe` call so far.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    #[must_use]
    pub fn subscribe_positions(&self) -> Vec<i64> {
        self.subscribe_positions.lock().unwrap().clone()
    }

    /// Number of `subscribe` calls so far.
    #[must_use]
    pub fn subscribe_count(&self) -> u64 {
        self.subscribe_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogReader for ScriptedLog {
    async fn oldest_available_sequence(&self, _partition_key: &str) -> Result<i64, ReplicaError> {
        Ok(self.floor)
    }

    async fn subscribe(
        &self,
        _partition_key: &str,
        from_sequence: i64,
    ) -> Result<Box<dyn LogSubscription>, ReplicaError> {
        self.subscribe_positions.lock().unwrap().push(from_sequence);
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        let steps = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        Ok(Box::new(ScriptedSubscription { steps }))
    }
}

struct ScriptedSubscription {
    steps: VecDeque<ScriptStep>,
}

#[async_trait]
impl LogSubscription for ScriptedSubscription {
    async fn next_record(&mut self) -> Result<LogRecord, ReplicaError> {
        match self.steps.pop_front() {
            Some(ScriptStep::Deliver(record)) => Ok(record),
            Some(ScriptStep::Disconnect(reason)) => {
                Err(ReplicaError::TransientTransport(reason.to_owned()))
            }
            // Script exhausted: behave like a partition with no new traffic.
            None => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        self.steps.clear();
    }
}
