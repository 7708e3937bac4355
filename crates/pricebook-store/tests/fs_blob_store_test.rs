//! Integration tests for the filesystem blob store.

use pricebook_store::{BlobError, BlobStore, FsBlobStore};

#[tokio::test]
async fn test_put_then_get_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path());

    store
        .put("snapshots/pricing-0/a.json", b"payload".to_vec())
        .await
        .unwrap();
    let bytes = store.get("snapshots/pricing-0/a.json").await.unwrap();

    assert_eq!(bytes, b"payload");
}

#[tokio::test]
async fn test_put_replaces_existing_blob() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path());

    store.put("k", b"one".to_vec()).await.unwrap();
    store.put("k", b"two".to_vec()).await.unwrap();

    assert_eq!(store.get("k").await.unwrap(), b"two");
}

#[tokio::test]
async fn test_get_missing_key_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path());

    let err = store.get("absent").await.unwrap_err();

    assert!(matches!(err, BlobError::NotFound(_)));
}

#[tokio::test]
async fn test_list_returns_sorted_keys_under_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path());
    store.put("snapshots/p/002.json", vec![2]).await.unwrap();
    store.put("snapshots/p/001.json", vec![1]).await.unwrap();
    store.put("snapshots/q/001.json", vec![9]).await.unwrap();
    store.put("other/x", vec![0]).await.unwrap();

    let keys = store.list("snapshots/p/").await.unwrap();

    assert_eq!(keys, vec!["snapshots/p/001.json", "snapshots/p/002.json"]);
}

#[tokio::test]
async fn test_list_on_empty_root_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path().join("never-created"));

    let keys = store.list("snapshots/").await.unwrap();

    assert!(keys.is_empty());
}

#[tokio::test]
async fn test_no_temp_files_left_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsBlobStore::new(dir.path());
    store.put("a/b.json", b"data".to_vec()).await.unwrap();

    let keys = store.list("").await.unwrap();

    assert_eq!(keys, vec!["a/b.json"]);
}
