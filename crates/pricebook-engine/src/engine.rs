//! The replication engine state machine.
//!
//! One engine instance owns one partition cursor and publishes one immutable
//! state value. The lifecycle is `Bootstrapping → ArchiveCatchUp →
//! LiveStreaming`; the first two phases run inside [`ReplicationEngine::start`]
//! and the live phase runs on a dedicated driver task, which is the sole
//! writer of the published state.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use pricebook_core::archive::ArchiveReader;
use pricebook_core::codec;
use pricebook_core::error::ReplicaError;
use pricebook_core::event::LogRecord;
use pricebook_core::log::{LogReader, LogSubscription};
use pricebook_core::reducer;
use pricebook_core::snapshot::SnapshotStore;
use pricebook_core::state::PricingState;

use crate::config::{EngineConfig, MalformedEventPolicy};

/// An event-sourced replica of the pricing configuration for one partition.
///
/// All methods take `&self`; the engine is normally held in an `Arc` shared
/// between the serving path (readers) and the snapshot scheduler.
pub struct ReplicationEngine {
    config: EngineConfig,
    log: Arc<dyn LogReader>,
    archive: Arc<dyn ArchiveReader>,
    snapshots: Arc<dyn SnapshotStore>,
    state_tx: Arc<watch::Sender<Arc<PricingState>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    healthy: Arc<AtomicBool>,
    events_applied: Arc<AtomicU64>,
    duplicates_skipped: Arc<AtomicU64>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl ReplicationEngine {
    /// Creates an engine wired to its three collaborators. Nothing happens
    /// until [`start`](Self::start) is called.
    #[must_use]
    pub fn new(
        config: EngineConfig,
        log: Arc<dyn LogReader>,
        archive: Arc<dyn ArchiveReader>,
        snapshots: Arc<dyn SnapshotStore>,
    ) -> Self {
        let (state_tx, _state_rx) = watch::channel(Arc::new(PricingState::empty()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            config,
            log,
            archive,
            snapshots,
            state_tx: Arc::new(state_tx),
            shutdown_tx,
            shutdown_rx,
            healthy: Arc::new(AtomicBool::new(false)),
            events_applied: Arc::new(AtomicU64::new(0)),
            duplicates_skipped: Arc::new(AtomicU64::new(0)),
            driver: Mutex::new(None),
        }
    }

    /// The partition this engine replicates.
    #[must_use]
    pub fn partition_key(&self) -> &str {
        &self.config.partition_key
    }

    /// Returns the latest published state. Never blocks and never observes a
    /// partially-applied event: publication swaps a whole `Arc`.
    #[must_use]
    pub fn current_state(&self) -> Arc<PricingState> {
        self.state_tx.borrow().clone()
    }

    /// Whether the engine is live and applying fresh events. A structurally
    /// failed engine keeps serving its last good state while unhealthy, so a
    /// front end can fall back to a healthy peer.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    /// Total events applied since start, across archive and live tiers.
    #[must_use]
    pub fn events_applied(&self) -> u64 {
        self.events_applied.load(Ordering::SeqCst)
    }

    /// Total duplicate deliveries absorbed.
    #[must_use]
    pub fn duplicates_skipped(&self) -> u64 {
        self.duplicates_skipped.load(Ordering::SeqCst)
    }

    /// Runs bootstrap and archive catch-up, opens the live subscription, and
    /// spawns the driver task. Returns once the engine is live.
    ///
    /// # Errors
    ///
    /// Returns `Bootstrap` if the engine is already started or the snapshot
    /// tier is unusable, `RangeUnavailable` if the archive cannot bridge the
    /// retention gap, and `MalformedEvent` under the fail-fast policy.
    pub async fn start(&self) -> Result<(), ReplicaError> {
        let mut driver_slot = self.driver.lock().await;
        if driver_slot.is_some() {
            return Err(ReplicaError::Bootstrap("engine already started".to_owned()));
        }

        let partition = self.config.partition_key.clone();

        // Bootstrapping: resume from the latest snapshot, or empty at −1.
        let mut state = match self.snapshots.load_latest(&partition).await? {
            Some(snapshot) => {
                let state = codec::decode_state(&snapshot.payload)?;
                info!(
                    partition,
                    sequence = state.as_of_sequence,
                    "resumed from snapshot"
                );
                state
            }
            None => {
                info!(partition, "no snapshot found; starting from empty state");
                PricingState::empty()
            }
        };
        self.state_tx.send_replace(Arc::new(state.clone()));
        let mut next_sequence = state.as_of_sequence + 1;

        // ArchiveCatchUp: bridge [next, floor) from cold storage if the live
        // log has already expired it. The floor is first-available, so a
        // cursor equal to the floor needs no archive at all.
        let floor = self
            .retry_startup("retention floor query", || {
                let log = Arc::clone(&self.log);
                let partition = partition.clone();
                async move { log.oldest_available_sequence(&partition).await }
            })
            .await?;
        if next_sequence < floor {
            info!(
                partition,
                from = next_sequence,
                to = floor,
                "required range expired from live log; replaying archive"
            );
            state = self.catch_up_from_archive(state, &mut next_sequence, floor).await?;
        }

        let subscription = self
            .retry_startup("live subscription", || {
                let log = Arc::clone(&self.log);
                let partition = partition.clone();
                async move { log.subscribe(&partition, next_sequence).await }
            })
            .await?;

        self.healthy.store(true, Ordering::SeqCst);
        info!(partition, cursor = next_sequence, "entering live streaming");

        let driver = Driver {
            config: self.config.clone(),
            log: Arc::clone(&self.log),
            state_tx: Arc::clone(&self.state_tx),
            healthy: Arc::clone(&self.healthy),
            events_applied: Arc::clone(&self.events_applied),
            duplicates_skipped: Arc::clone(&self.duplicates_skipped),
            shutdown: self.shutdown_rx.clone(),
        };
        *driver_slot = Some(tokio::spawn(driver.run(subscription, state, next_sequence)));
        Ok(())
    }

    /// Signals the driver to stop and waits for it to exit. The in-flight
    /// event, if any, finishes applying first. Idempotent.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.driver.lock().await.take() {
            if handle.await.is_err() {
                error!(
                    partition = self.config.partition_key,
                    "driver task panicked during shutdown"
                );
            }
        }
        self.healthy.store(false, Ordering::SeqCst);
    }

    async fn catch_up_from_archive(
        &self,
        mut state: PricingState,
        next_sequence: &mut i64,
        floor: i64,
    ) -> Result<PricingState, ReplicaError> {
        let partition = self.config.partition_key.clone();
        while *next_sequence < floor {
            let to = floor.min(*next_sequence + self.config.archive_chunk_size);
            let from = *next_sequence;
            let records = self
                .retry_startup("archive range read", || {
                    let archive = Arc::clone(&self.archive);
                    let partition = partition.clone();
                    async move { archive.read_range(&partition, from, to).await }
                })
                .await?;
            for record in &records {
                if record.sequence_number != *next_sequence {
                    // The reader returned something non-contiguous; treat it
                    // exactly like a hole it failed to report.
                    return Err(ReplicaError::RangeUnavailable {
                        partition,
                        from,
                        to,
                    });
                }
                match codec::decode_record(record) {
                    Ok(event) => {
                        state = reducer::apply(&state, &event);
                        self.state_tx.send_replace(Arc::new(state.clone()));
                        self.events_applied.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(err) => match self.config.malformed_event_policy {
                        MalformedEventPolicy::FailFast => return Err(err),
                        MalformedEventPolicy::SkipAndLog => {
                            warn!(
                                partition,
                                sequence = record.sequence_number,
                                %err,
                                "skipping malformed archived event"
                            );
                        }
                    },
                }
                *next_sequence += 1;
            }
        }
        info!(
            partition = self.config.partition_key,
            cursor = *next_sequence,
            "archive catch-up complete"
        );
        Ok(state)
    }

    /// Retries a startup-time collaborator call on transient failures, then
    /// converts persistent failure into a fatal bootstrap error.
    async fn retry_startup<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, ReplicaError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ReplicaError>>,
    {
        let mut delay = self.config.resubscribe_backoff_initial;
        let mut last_failure = String::new();
        for attempt in 1..=self.config.startup_attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    warn!(attempt, %err, "transient failure during {what}");
                    last_failure = err.to_string();
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(self.config.resubscribe_backoff_max);
                }
                Err(err) => return Err(err),
            }
        }
        Err(ReplicaError::Bootstrap(format!(
            "{what} failed after {} attempts: {last_failure}",
            self.config.startup_attempts
        )))
    }
}

/// State owned by the live-streaming driver task.
struct Driver {
    config: EngineConfig,
    log: Arc<dyn LogReader>,
    state_tx: Arc<watch::Sender<Arc<PricingState>>>,
    healthy: Arc<AtomicBool>,
    events_applied: Arc<AtomicU64>,
    duplicates_skipped: Arc<AtomicU64>,
    shutdown: watch::Receiver<bool>,
}

impl Driver {
    async fn run(
        mut self,
        mut subscription: Box<dyn LogSubscription>,
        mut state: PricingState,
        mut next_sequence: i64,
    ) {
        let partition = self.config.partition_key.clone();
        let mut backoff = self.config.resubscribe_backoff_initial;
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    subscription.close().await;
                    info!(partition, "live streaming stopped");
                    return;
                }
                received = subscription.next_record() => match received {
                    Ok(record) => {
                        if record.sequence_number < next_sequence {
                            debug!(
                                partition,
                                sequence = record.sequence_number,
                                expected = next_sequence,
                                "duplicate delivery skipped"
                            );
                            self.duplicates_skipped.fetch_add(1, Ordering::SeqCst);
                            continue;
                        }
                        if record.sequence_number > next_sequence {
                            let gap = ReplicaError::SequenceGap {
                                partition: partition.clone(),
                                expected: next_sequence,
                                received: record.sequence_number,
                            };
                            error!(%gap, "live stream ran ahead of the cursor");
                            self.healthy.store(false, Ordering::SeqCst);
                            subscription.close().await;
                            return;
                        }
                        match self.apply_record(&record, &mut state, &mut next_sequence) {
                            Ok(()) => backoff = self.config.resubscribe_backoff_initial,
                            Err(()) => {
                                subscription.close().await;
                                return;
                            }
                        }
                    }
                    Err(err) if err.is_transient() => {
                        warn!(partition, %err, "live subscription lost; will resubscribe");
                        subscription.close().await;
                        match self.resubscribe(next_sequence, &mut backoff).await {
                            Some(fresh) => subscription = fresh,
                            None => return,
                        }
                    }
                    Err(err) => {
                        error!(partition, %err, "unrecoverable stream failure");
                        self.healthy.store(false, Ordering::SeqCst);
                        subscription.close().await;
                        return;
                    }
                }
            }
        }
    }

    /// Decodes and applies one in-order record. `Err(())` means the driver
    /// must terminate (fail-fast on a malformed payload).
    fn apply_record(
        &self,
        record: &LogRecord,
        state: &mut PricingState,
        next_sequence: &mut i64,
    ) -> Result<(), ()> {
        match codec::decode_record(record) {
            Ok(event) => {
                *state = reducer::apply(state, &event);
                self.state_tx.send_replace(Arc::new(state.clone()));
                *next_sequence += 1;
                self.events_applied.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
            Err(err) => match self.config.malformed_event_policy {
                MalformedEventPolicy::FailFast => {
                    error!(
                        partition = self.config.partition_key,
                        sequence = record.sequence_number,
                        %err,
                        "malformed event; failing fast"
                    );
                    self.healthy.store(false, Ordering::SeqCst);
                    Err(())
                }
                MalformedEventPolicy::SkipAndLog => {
                    warn!(
                        partition = self.config.partition_key,
                        sequence = record.sequence_number,
                        %err,
                        "skipping malformed event"
                    );
                    *next_sequence += 1;
                    Ok(())
                }
            },
        }
    }

    /// Reopens the subscription at the cursor with bounded exponential
    /// backoff. Retries are unlimited; `None` means shutdown was requested.
    async fn resubscribe(
        &mut self,
        from_sequence: i64,
        backoff: &mut Duration,
    ) -> Option<Box<dyn LogSubscription>> {
        loop {
            tokio::select! {
                _ = self.shutdown.changed() => return None,
                () = tokio::time::sleep(*backoff) => {}
            }
            match self
                .log
                .subscribe(&self.config.partition_key, from_sequence)
                .await
            {
                Ok(subscription) => {
                    info!(
                        partition = self.config.partition_key,
                        cursor = from_sequence,
                        "resubscribed to live log"
                    );
                    *backoff = self.config.resubscribe_backoff_initial;
                    return Some(subscription);
                }
                Err(err) => {
                    warn!(
                        partition = self.config.partition_key,
                        %err,
                        delay_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        "resubscribe attempt failed"
                    );
                    *backoff = (*backoff * 2).min(self.config.resubscribe_backoff_max);
                }
            }
        }
    }
}
