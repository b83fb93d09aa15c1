//! The durable key-value table.

use crate::batch::WriteBatch;
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::table::frame::{
    decode_frame, encode_frame, frame_len, FrameOp, CRC_SIZE, FRAME_MAGIC, HEADER_SIZE,
};
use crate::types::SequenceNumber;
use arcade_storage::StorageBackend;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Where the current value of a key lives in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueLocation {
    /// Absolute offset of the value bytes.
    pub offset: u64,
    /// Value length.
    pub len: u32,
}

/// Result of scanning every frame in a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Number of complete frames.
    pub frames: usize,
    /// Number of mutations across all frames.
    pub ops: usize,
    /// Number of keys live after replay.
    pub live_keys: usize,
    /// Highest sequence number seen.
    pub last_sequence: SequenceNumber,
    /// Bytes after the last complete frame (a torn write).
    pub torn_tail_bytes: u64,
}

/// Manages the table: one writer, many readers.
///
/// The table is an append-only sequence of frames. An in-memory index maps
/// every live key to the location of its latest value.
///
/// ## Atomicity
///
/// - Writers are serialized by the writer lock. Waiting for it is bounded
///   by the configured busy timeout.
/// - A frame that fails to append or flush is truncated away before the
///   writer lock is released.
/// - The index is updated for the whole frame under one write lock, after
///   the frame is durable. Readers therefore observe all of a batch or none
///   of it.
pub struct TableManager {
    /// Writer handle. Holding this lock makes the caller the single writer.
    writer: Mutex<Box<dyn StorageBackend>>,
    /// Handle used only to open further reader handles.
    origin: Box<dyn StorageBackend>,
    /// key -> location of the latest value.
    index: RwLock<HashMap<String, ValueLocation>>,
    /// Sequence of the last applied frame.
    last_seq: AtomicU64,
    busy_timeout: Duration,
    sync_on_commit: bool,
}

impl TableManager {
    /// Opens a table over `backend`, replaying existing frames.
    ///
    /// A torn frame at the tail (crash mid-write) is discarded, and so is a
    /// zero-filled tail. A complete frame that fails its checksum is fatal,
    /// as is a damaged frame followed by a valid one.
    ///
    /// # Errors
    ///
    /// Returns `ChecksumMismatch` or `TableCorruption` for a damaged table,
    /// or a storage error if the backend cannot be read.
    pub fn open(mut backend: Box<dyn StorageBackend>, config: &Config) -> CoreResult<Self> {
        let replay = replay(backend.as_ref())?;

        if replay.report.torn_tail_bytes > 0 {
            tracing::warn!(
                torn_bytes = replay.report.torn_tail_bytes,
                valid_len = replay.valid_len,
                "discarding torn frame at table tail"
            );
            backend.truncate(replay.valid_len)?;
            backend.sync()?;
        }

        tracing::info!(
            frames = replay.report.frames,
            live_keys = replay.report.live_keys,
            last_sequence = %replay.report.last_sequence,
            "table opened"
        );

        let origin = backend.open_handle()?;

        Ok(Self {
            writer: Mutex::new(backend),
            origin,
            index: RwLock::new(replay.index),
            last_seq: AtomicU64::new(replay.report.last_sequence.as_u64()),
            busy_timeout: config.busy_timeout,
            sync_on_commit: config.sync_on_commit,
        })
    }

    /// Opens an independent reader handle onto the table bytes.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the backend refuses a new handle.
    pub fn open_reader(&self) -> CoreResult<Box<dyn StorageBackend>> {
        self.origin
            .open_handle()
            .map_err(|e| CoreError::store_unavailable(format!("cannot open table handle: {e}")))
    }

    /// Returns the location of the latest value of `key`.
    #[must_use]
    pub fn locate(&self, key: &str) -> Option<ValueLocation> {
        self.index.read().get(key).copied()
    }

    /// Reads the committed value of `key` through `reader`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the value bytes cannot be read.
    pub fn read(&self, reader: &dyn StorageBackend, key: &str) -> CoreResult<Option<Vec<u8>>> {
        // Frame bytes are immutable once indexed, so the index lock is not
        // held across the read.
        let Some(location) = self.locate(key) else {
            return Ok(None);
        };
        let value = reader.read_at(location.offset, location.len as usize)?;
        Ok(Some(value))
    }

    /// Applies `batch` as one frame.
    ///
    /// Returns the sequence number assigned to the frame.
    ///
    /// # Errors
    ///
    /// - `StoreBusy` if the writer lock is not acquired within the busy timeout
    /// - `InvalidArgument` if the batch cannot be encoded
    /// - a storage error if the append or flush fails; the table is unchanged
    pub fn apply(&self, batch: &WriteBatch) -> CoreResult<SequenceNumber> {
        let Some(mut writer) = self.writer.try_lock_for(self.busy_timeout) else {
            return Err(CoreError::StoreBusy {
                waited: self.busy_timeout,
            });
        };

        let sequence = SequenceNumber::new(self.last_seq.load(Ordering::SeqCst)).next();
        let frame = encode_frame(sequence, batch)?;
        let base = writer.size()?;

        if let Err(err) = write_frame(&mut **writer, &frame.bytes, self.sync_on_commit) {
            if let Err(undo) = writer.truncate(base) {
                tracing::error!(error = %undo, base, "failed to discard partial frame");
            }
            return Err(err);
        }

        {
            let mut index = self.index.write();
            for key in batch.deletes() {
                index.remove(key);
            }
            for (key, span) in frame.spans {
                index.insert(
                    key,
                    ValueLocation {
                        offset: base + span.offset,
                        len: span.len,
                    },
                );
            }
        }
        self.last_seq.store(sequence.as_u64(), Ordering::SeqCst);

        tracing::debug!(
            %sequence,
            writes = batch.writes().len(),
            deletes = batch.deletes().len(),
            bytes = frame.bytes.len(),
            "frame applied"
        );

        Ok(sequence)
    }

    /// Returns every committed row ordered by key.
    ///
    /// The key set is taken from one index snapshot.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a value cannot be read.
    pub fn scan(&self, reader: &dyn StorageBackend) -> CoreResult<Vec<(String, Vec<u8>)>> {
        let mut entries: Vec<(String, ValueLocation)> = self
            .index
            .read()
            .iter()
            .map(|(key, location)| (key.clone(), *location))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        entries
            .into_iter()
            .map(|(key, location)| {
                let value = reader.read_at(location.offset, location.len as usize)?;
                Ok((key, value))
            })
            .collect()
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// Returns true if no key is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Returns the sequence number of the last applied frame.
    #[must_use]
    pub fn last_sequence(&self) -> SequenceNumber {
        SequenceNumber::new(self.last_seq.load(Ordering::SeqCst))
    }

    /// Holds the writer lock until the guard drops.
    #[cfg(test)]
    pub(crate) fn lock_writer_for_test(&self) -> parking_lot::MutexGuard<'_, Box<dyn StorageBackend>> {
        self.writer.lock()
    }
}

impl std::fmt::Debug for TableManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableManager")
            .field("live_keys", &self.len())
            .field("last_sequence", &self.last_sequence())
            .field("busy_timeout", &self.busy_timeout)
            .finish_non_exhaustive()
    }
}

fn write_frame(writer: &mut dyn StorageBackend, bytes: &[u8], sync: bool) -> CoreResult<()> {
    writer.append(bytes)?;
    writer.flush()?;
    if sync {
        writer.sync()?;
    }
    Ok(())
}

struct Replay {
    index: HashMap<String, ValueLocation>,
    valid_len: u64,
    report: VerifyReport,
}

fn replay(backend: &dyn StorageBackend) -> CoreResult<Replay> {
    let size = backend.size()?;
    let mut index = HashMap::new();
    let mut report = VerifyReport::default();
    let mut offset = 0u64;

    while offset < size {
        let remaining = size - offset;
        if remaining < (HEADER_SIZE + CRC_SIZE) as u64 {
            break;
        }

        let prefix = backend.read_at(offset, 4)?;
        let len = frame_len(&prefix).unwrap_or(0);
        if len < HEADER_SIZE + CRC_SIZE || len as u64 > remaining {
            let tail = backend.read_at(offset, remaining as usize)?;
            check_torn_tail(&tail, offset)?;
            break;
        }

        let data = backend.read_at(offset, len)?;
        let frame = decode_frame(&data)?;

        for op in frame.ops {
            report.ops += 1;
            match op {
                FrameOp::Put { key, span } => {
                    index.insert(
                        key,
                        ValueLocation {
                            offset: offset + span.offset,
                            len: span.len,
                        },
                    );
                }
                FrameOp::Delete { key } => {
                    index.remove(&key);
                }
            }
        }

        report.frames += 1;
        report.last_sequence = report.last_sequence.max(frame.sequence);
        offset += len as u64;
    }

    report.live_keys = index.len();
    report.torn_tail_bytes = size - offset;

    Ok(Replay {
        index,
        valid_len: offset,
        report,
    })
}

/// Accepts the bytes from `offset` to the end as a torn write.
///
/// They are torn if they are all zero, or if no complete frame with a valid
/// checksum starts anywhere inside them. Otherwise a damaged frame sits in
/// front of committed data and the table is corrupt.
fn check_torn_tail(tail: &[u8], offset: u64) -> CoreResult<()> {
    if tail.iter().all(|&byte| byte == 0) {
        return Ok(());
    }

    let min_len = HEADER_SIZE + CRC_SIZE;
    for start in 0..tail.len().saturating_sub(min_len - 1) {
        if tail[start + 4..start + 8] != FRAME_MAGIC {
            continue;
        }
        let Some(len) = frame_len(&tail[start..]) else {
            continue;
        };
        if len < min_len || start + len > tail.len() {
            continue;
        }
        if decode_frame(&tail[start..start + len]).is_ok() {
            return Err(CoreError::table_corruption(format!(
                "damaged frame at offset {offset} is followed by a valid frame at offset {}",
                offset + start as u64
            )));
        }
    }

    Ok(())
}

/// Scans every frame of a table without modifying it.
///
/// # Errors
///
/// Returns the first corruption found, or a storage error.
pub fn verify(backend: &dyn StorageBackend) -> CoreResult<VerifyReport> {
    Ok(replay(backend)?.report)
}
