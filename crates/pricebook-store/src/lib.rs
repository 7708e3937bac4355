//! Pricebook Store — storage-tier implementations.
//!
//! Infrastructure for the two cold tiers the replica touches: a blob store
//! abstraction with a filesystem implementation, the blob-backed snapshot
//! store client, and a reader for the capture archive an external process
//! writes as the live log expires records.

pub mod archive;
pub mod blob;
pub mod snapshot_store;

pub use archive::FsArchiveReader;
pub use blob::{BlobError, BlobStore, FsBlobStore};
pub use snapshot_store::BlobSnapshotStore;
