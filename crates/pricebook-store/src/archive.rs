//! Filesystem reader for the capture archive.
//!
//! An external capture process drains expired log records into batch files,
//! one JSON array of records per file, laid out as
//! `{root}/{partition}/{first:020}-{last:020}.json` with inclusive bounds.
//! This reader only consumes that layout; it never writes.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use pricebook_core::archive::ArchiveReader;
use pricebook_core::error::ReplicaError;
use pricebook_core::event::LogRecord;

/// Reads contiguous event ranges from capture batch files.
#[derive(Debug, Clone)]
pub struct FsArchiveReader {
    root: PathBuf,
}

impl FsArchiveReader {
    /// Creates a reader over a capture directory tree.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Lists batch bounds for a partition, sorted by first sequence.
    ///
    /// A missing partition directory means nothing was ever captured; the
    /// caller turns the resulting empty coverage into `RangeUnavailable`.
    async fn batches(&self, partition_key: &str) -> Result<Vec<(i64, i64, PathBuf)>, ReplicaError> {
        let dir = self.root.join(partition_key);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ReplicaError::TransientTransport(e.to_string())),
        };
        let mut batches = Vec::new();
        loop {
            let entry = entries
                .next_entry()
                .await
                .map_err(|e| ReplicaError::TransientTransport(e.to_string()))?;
            let Some(entry) = entry else { break };
            let name = entry.file_name();
            match parse_batch_name(&name.to_string_lossy()) {
                Some((first, last)) => batches.push((first, last, entry.path())),
                None => debug!(name = %name.to_string_lossy(), "ignoring non-batch file"),
            }
        }
        batches.sort_by_key(|(first, _, _)| *first);
        Ok(batches)
    }
}

#[async_trait]
impl ArchiveReader for FsArchiveReader {
    async fn read_range(
        &self,
        partition_key: &str,
        from_sequence: i64,
        to_sequence: i64,
    ) -> Result<Vec<LogRecord>, ReplicaError> {
        if from_sequence >= to_sequence {
            return Ok(Vec::new());
        }
        let unavailable = || ReplicaError::RangeUnavailable {
            partition: partition_key.to_owned(),
            from: from_sequence,
            to: to_sequence,
        };

        let mut out = Vec::new();
        let mut needed = from_sequence;
        for (first, last, path) in self.batches(partition_key).await? {
            if last < needed {
                continue;
            }
            if needed >= to_sequence {
                break;
            }
            // Batches are sorted; if this one starts past the cursor, the
            // sequence in between was never captured.
            if first > needed {
                return Err(unavailable());
            }
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| ReplicaError::TransientTransport(e.to_string()))?;
            let records: Vec<LogRecord> =
                serde_json::from_slice(&bytes).map_err(|_| unavailable())?;
            for record in records {
                if record.sequence_number < needed {
                    continue;
                }
                if record.sequence_number >= to_sequence {
                    break;
                }
                if record.sequence_number != needed {
                    // A hole inside a batch file; the range cannot be
                    // satisfied contiguously.
                    return Err(unavailable());
                }
                out.push(record);
                needed += 1;
            }
            // The batch claimed coverage through `last`; anything short of
            // that is a hole too.
            if needed <= last && needed < to_sequence {
                return Err(unavailable());
            }
        }
        if needed < to_sequence {
            return Err(unavailable());
        }
        Ok(out)
    }
}

fn parse_batch_name(name: &str) -> Option<(i64, i64)> {
    let stem = name.strip_suffix(".json")?;
    let (first, last) = stem.split_once('-')?;
    let first: i64 = first.parse().ok()?;
    let last: i64 = last.parse().ok()?;
    (first <= last).then_some((first, last))
}

#[cfg(test)]
mod tests {
    use super::parse_batch_name;

    #[test]
    fn test_parse_batch_name_accepts_padded_bounds() {
        assert_eq!(
            parse_batch_name("00000000000000000410-00000000000000000411.json"),
            Some((410, 411))
        );
    }

    #[test]
    fn test_parse_batch_name_rejects_garbage() {
        assert_eq!(parse_batch_name("README.md"), None);
        assert_eq!(parse_batch_name("410-409.json"), None);
        assert_eq!(parse_batch_name("410.json"), None);
    }
}
