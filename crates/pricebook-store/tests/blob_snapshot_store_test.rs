//! Integration tests for the blob-backed snapshot store client.

use chrono::{TimeZone, Utc};

use pricebook_core::codec;
use pricebook_core::error::ReplicaError;
use pricebook_core::snapshot::{Snapshot, SnapshotStore};
use pricebook_core::state::PricingState;
use pricebook_store::{BlobSnapshotStore, BlobStore, FsBlobStore};

const PARTITION: &str = "pricing-0";

fn snapshot(sequence: i64) -> Snapshot {
    let mut state = PricingState::empty();
    state.as_of_sequence = sequence;
    Snapshot {
        partition_key: PARTITION.to_owned(),
        sequence_number: sequence,
        payload: codec::encode_state(&state).unwrap(),
        created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_load_latest_on_empty_store_is_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlobSnapshotStore::new(FsBlobStore::new(dir.path()));

    let loaded = store.load_latest(PARTITION).await.unwrap();

    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_store_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlobSnapshotStore::new(FsBlobStore::new(dir.path()));
    let snap = snapshot(409);

    store.store(snap.clone()).await.unwrap();
    let loaded = store.load_latest(PARTITION).await.unwrap().unwrap();

    assert_eq!(loaded.sequence_number, 409);
    assert_eq!(loaded.created_at, snap.created_at);
    let restored = codec::decode_state(&loaded.payload).unwrap();
    assert_eq!(restored.as_of_sequence, 409);
}

#[tokio::test]
async fn test_load_latest_picks_highest_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlobSnapshotStore::new(FsBlobStore::new(dir.path()));
    store.store(snapshot(7)).await.unwrap();
    store.store(snapshot(300)).await.unwrap();

    let loaded = store.load_latest(PARTITION).await.unwrap().unwrap();

    assert_eq!(loaded.sequence_number, 300);
}

#[tokio::test]
async fn test_rejects_write_not_newer_than_stored() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlobSnapshotStore::new(FsBlobStore::new(dir.path()));
    store.store(snapshot(300)).await.unwrap();

    let equal = store.store(snapshot(300)).await;
    let older = store.store(snapshot(299)).await;

    assert!(matches!(equal.unwrap_err(), ReplicaError::SnapshotWrite(_)));
    assert!(matches!(older.unwrap_err(), ReplicaError::SnapshotWrite(_)));
    assert_eq!(
        store
            .load_latest(PARTITION)
            .await
            .unwrap()
            .unwrap()
            .sequence_number,
        300
    );
}

#[tokio::test]
async fn test_write_allowed_again_after_external_pruning() {
    // An external deleter clearing the partition must not wedge the writer.
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path());
    let store = BlobSnapshotStore::new(blobs.clone());
    store.store(snapshot(300)).await.unwrap();

    for key in blobs.list("snapshots/").await.unwrap() {
        std::fs::remove_file(dir.path().join(&key)).unwrap();
    }

    store.store(snapshot(5)).await.unwrap();
    let loaded = store.load_latest(PARTITION).await.unwrap().unwrap();
    assert_eq!(loaded.sequence_number, 5);
}

#[tokio::test]
async fn test_partitions_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let store = BlobSnapshotStore::new(FsBlobStore::new(dir.path()));
    store.store(snapshot(10)).await.unwrap();

    let other = store.load_latest("pricing-1").await.unwrap();

    assert!(other.is_none());
}

#[tokio::test]
async fn test_foreign_blobs_under_prefix_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FsBlobStore::new(dir.path());
    blobs
        .put(
            &format!("snapshots/{PARTITION}/README.txt"),
            b"notes".to_vec(),
        )
        .await
        .unwrap();
    let store = BlobSnapshotStore::new(blobs);
    store.store(snapshot(12)).await.unwrap();

    let loaded = store.load_latest(PARTITION).await.unwrap().unwrap();

    assert_eq!(loaded.sequence_number, 12);
}
