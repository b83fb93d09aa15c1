//! The backing store: a durable single-table key-value map.
//!
//! ## Frame Format
//!
//! ```text
//! | frame_len (4) | magic (4) | sequence (8) | op_count (4) | ops (N) | crc32 (4) |
//! op: | kind (1) | key_len (4) | key | [ value_len (4) | value ] |
//! ```
//!
//! Every autocommit write and every outermost commit is one frame, which is
//! what makes a batch all-or-nothing on disk and in the index.
//!
//! ## Connections
//!
//! Callers never touch the writer or reader handles directly. They check a
//! [`Connection`] out of the [`ConnectionPool`]; each connection reads through
//! its own storage handle and writes through the table's single writer.

mod connection;
mod crc;
mod frame;
mod manager;
mod pool;

pub use connection::Connection;
pub use crc::compute_crc32;
pub use frame::{decode_frame, encode_frame, DecodedFrame, EncodedFrame, FrameOp, ValueSpan, FRAME_MAGIC};
pub use manager::{verify, TableManager, ValueLocation, VerifyReport};
pub use pool::{ConnectionPool, PooledConnection};

use crate::batch::WriteBatch;
use crate::error::CoreResult;
use crate::types::SequenceNumber;

/// Key-value operations offered by the backing store.
///
/// Not-found is `Ok(None)`, never an error. Every mutation is atomic and
/// visible to all connections once it returns.
pub trait BackingStore {
    /// Looks up the committed value of `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> CoreResult<Option<Vec<u8>>>;

    /// Upserts `key`. Repeating the call is harmless.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write; nothing is applied.
    fn set(&self, key: &str, value: &[u8]) -> CoreResult<SequenceNumber>;

    /// Deletes `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the delete; nothing is applied.
    fn delete(&self, key: &str) -> CoreResult<SequenceNumber>;

    /// Applies all writes and deletes of `batch` together or not at all.
    ///
    /// # Errors
    ///
    /// Returns `BatchApplyFailed` if the batch was rejected; the store is
    /// unchanged.
    fn batch_apply(&self, batch: &WriteBatch) -> CoreResult<SequenceNumber>;
}
