//! Append-only audit log of flushes.
//!
//! Every successful flush to the table (an autocommit write or delete, or an
//! outermost commit) produces one [`CommitRecord`]. The log is a side
//! channel: a failed append is reported to the caller but never undoes the
//! flush that preceded it.

use crate::batch::WriteBatch;
use crate::error::{CoreError, CoreResult};
use crate::types::{CommitKind, SequenceNumber};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// One successful flush.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// When the record was created, after the flush succeeded.
    pub timestamp: DateTime<Utc>,
    /// Label of the session that flushed.
    pub origin: String,
    /// Autocommit or outermost transaction commit.
    #[serde(rename = "type")]
    pub kind: CommitKind,
    /// Table sequence number of the flush.
    pub sequence: SequenceNumber,
    /// Values written, hex encoded on disk.
    #[serde(with = "hex_values")]
    pub writes: BTreeMap<String, Vec<u8>>,
    /// Keys deleted, in key order.
    pub deletes: BTreeSet<String>,
}

impl CommitRecord {
    /// Creates a record for `batch`, timestamped now.
    #[must_use]
    pub fn new(
        origin: impl Into<String>,
        kind: CommitKind,
        sequence: SequenceNumber,
        batch: &WriteBatch,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            origin: origin.into(),
            kind,
            sequence,
            writes: batch.writes().clone(),
            deletes: batch.deletes().clone(),
        }
    }
}

mod hex_values {
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        values: &BTreeMap<String, Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(values.len()))?;
        for (key, value) in values {
            map.serialize_entry(key, &hex::encode(value))?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
        BTreeMap::<String, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(key, value)| {
                hex::decode(&value)
                    .map(|bytes| (key, bytes))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

/// Destination for commit records.
///
/// Appends are ordered by call arrival. Implementations must be safe to call
/// from many sessions at once.
pub trait CommitLogSink: Send + Sync + std::fmt::Debug {
    /// Appends one record.
    ///
    /// # Errors
    ///
    /// Returns `LogAppendFailed` if the record could not be written.
    fn append(&self, record: &CommitRecord) -> CoreResult<()>;

    /// Reads every record in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or holds a malformed record.
    fn read_all(&self) -> CoreResult<Vec<CommitRecord>>;
}

/// Commit log stored as one JSON object per line.
#[derive(Debug)]
pub struct JsonLinesCommitLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonLinesCommitLog {
    /// Opens the log at `path` for appending, creating it if needed.
    ///
    /// An unterminated final line (a crash mid-append) is cut off so the
    /// next record starts on a fresh line.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened or repaired.
    pub fn open(path: &Path) -> CoreResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        if file.metadata()?.len() > 0 {
            let bytes = std::fs::read(path)?;
            if bytes.last() != Some(&b'\n') {
                let keep = bytes.iter().rposition(|&b| b == b'\n').map_or(0, |pos| pos + 1);
                tracing::warn!(
                    path = %path.display(),
                    torn_bytes = bytes.len() - keep,
                    "discarding unterminated commit log record"
                );
                file.set_len(keep as u64)?;
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
    }

    /// Returns the log file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the log at `path` without opening it for writing.
    ///
    /// A missing file reads as an empty log. A malformed final line with no
    /// newline is a torn append and is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a complete line is
    /// malformed.
    pub fn read_path(path: &Path) -> CoreResult<Vec<CommitRecord>> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        for (index, raw) in text.split_inclusive('\n').enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(err) if !raw.ends_with('\n') => {
                    tracing::warn!(line = index + 1, error = %err, "skipping torn commit log record");
                }
                Err(err) => {
                    return Err(CoreError::invalid_format(format!(
                        "commit log line {}: {err}",
                        index + 1
                    )))
                }
            }
        }
        Ok(records)
    }
}

impl CommitLogSink for JsonLinesCommitLog {
    fn append(&self, record: &CommitRecord) -> CoreResult<()> {
        let mut line = serde_json::to_vec(record)
            .map_err(|err| CoreError::log_append_failed(err.to_string()))?;
        line.push(b'\n');

        let mut file = self.file.lock();
        let base = file
            .metadata()
            .map_err(|err| CoreError::log_append_failed(err.to_string()))?
            .len();

        if let Err(err) = file.write_all(&line).and_then(|()| file.flush()) {
            if let Err(undo) = file.set_len(base) {
                tracing::error!(error = %undo, base, "failed to discard partial commit log record");
            }
            return Err(CoreError::log_append_failed(err.to_string()));
        }
        Ok(())
    }

    fn read_all(&self) -> CoreResult<Vec<CommitRecord>> {
        let _appends = self.file.lock();
        Self::read_path(&self.path)
    }
}

/// Commit log kept in memory.
#[derive(Debug, Default)]
pub struct MemoryCommitLog {
    records: Mutex<Vec<CommitRecord>>,
}

impl MemoryCommitLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing was appended.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl CommitLogSink for MemoryCommitLog {
    fn append(&self, record: &CommitRecord) -> CoreResult<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn read_all(&self) -> CoreResult<Vec<CommitRecord>> {
        Ok(self.records.lock().clone())
    }
}
