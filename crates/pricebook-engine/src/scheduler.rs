//! The snapshot scheduler.
//!
//! An independent periodic task that serializes the engine's current state
//! and persists it to the snapshot store. It only ever reads the published
//! state; a failed or slow write never holds up streaming.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use pricebook_core::clock::Clock;
use pricebook_core::codec;
use pricebook_core::snapshot::{Snapshot, SnapshotStore};

use crate::config::SnapshotPolicy;
use crate::engine::ReplicationEngine;

/// Periodically persists snapshots of the engine's published state.
pub struct SnapshotScheduler {
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SnapshotScheduler {
    /// Spawns the scheduler task.
    #[must_use]
    pub fn spawn(
        engine: Arc<ReplicationEngine>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        policy: SnapshotPolicy,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ticker = Ticker {
            engine,
            store,
            clock,
            policy,
            // Whatever sequence the engine currently serves was either just
            // restored from a snapshot or is about to be superseded; only
            // progress beyond it is worth persisting.
            last_written_sequence: i64::MIN,
            last_snapshot_at: Instant::now(),
            events_at_last_write: 0,
        };
        let task = tokio::spawn(ticker.run(shutdown_rx));
        Self {
            shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Stops the scheduler and waits for its task to exit. Idempotent.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.task.lock().await.take() {
            if handle.await.is_err() {
                error!("snapshot scheduler task panicked during shutdown");
            }
        }
    }
}

struct Ticker {
    engine: Arc<ReplicationEngine>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    policy: SnapshotPolicy,
    last_written_sequence: i64,
    last_snapshot_at: Instant,
    events_at_last_write: u64,
}

impl Ticker {
    async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.last_written_sequence = self.engine.current_state().as_of_sequence;
        self.events_at_last_write = self.engine.events_applied();
        let mut interval = tokio::time::interval(self.policy.check_period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("snapshot scheduler stopped");
                    return;
                }
                _ = interval.tick() => self.tick().await,
            }
        }
    }

    async fn tick(&mut self) {
        let state = self.engine.current_state();
        if state.as_of_sequence <= self.last_written_sequence {
            return;
        }

        let time_due = self.last_snapshot_at.elapsed() >= self.policy.min_interval;
        let count_due = self.engine.events_applied() - self.events_at_last_write
            >= self.policy.event_count_threshold;
        if !time_due && !count_due {
            return;
        }

        let payload = match codec::encode_state(&state) {
            Ok(payload) => payload,
            Err(err) => {
                // Serialization failure never clears on retry; surface loudly
                // but keep the scheduler alive.
                error!(%err, "state serialization failed; snapshot not taken");
                return;
            }
        };
        let snapshot = Snapshot {
            partition_key: self.engine.partition_key().to_owned(),
            sequence_number: state.as_of_sequence,
            payload,
            created_at: self.clock.now(),
        };
        match self.store.store(snapshot).await {
            Ok(()) => {
                info!(
                    partition = self.engine.partition_key(),
                    sequence = state.as_of_sequence,
                    "snapshot persisted"
                );
                self.last_written_sequence = state.as_of_sequence;
                self.last_snapshot_at = Instant::now();
                self.events_at_last_write = self.engine.events_applied();
            }
            Err(err) => {
                // Retried on the next tick; streaming is unaffected.
                warn!(
                    partition = self.engine.partition_key(),
                    sequence = state.as_of_sequence,
                    %err,
                    "snapshot write failed; will retry on next tick"
                );
                debug!(next_check_in = ?self.policy.check_period);
            }
        }
    }
}
