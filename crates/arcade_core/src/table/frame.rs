//! Frame encoding for the durable table.
//!
//! Every flush is written as exactly one frame, so a batch is either fully
//! present in the table or not present at all.

use crate::batch::WriteBatch;
use crate::error::{CoreError, CoreResult};
use crate::table::crc::compute_crc32;
use crate::types::SequenceNumber;
use std::collections::BTreeMap;

/// Magic bytes identifying a table frame.
pub const FRAME_MAGIC: [u8; 4] = *b"AKVF";

/// frame_len (4) + magic (4) + sequence (8) + op_count (4)
pub const HEADER_SIZE: usize = 20;

/// CRC size.
pub const CRC_SIZE: usize = 4;

const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;

/// Location of a value inside a frame, relative to the frame start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSpan {
    /// Offset of the first value byte from the frame start.
    pub offset: u64,
    /// Value length in bytes.
    pub len: u32,
}

/// A frame ready to be appended.
#[derive(Debug)]
pub struct EncodedFrame {
    /// The full frame bytes, including length prefix and CRC.
    pub bytes: Vec<u8>,
    /// Where each written value lives inside `bytes`.
    pub spans: BTreeMap<String, ValueSpan>,
}

/// One decoded mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOp {
    /// Upsert; the value is located by its span.
    Put {
        /// The written key.
        key: String,
        /// Where the value lives inside the frame.
        span: ValueSpan,
    },
    /// Delete of a key.
    Delete {
        /// The deleted key.
        key: String,
    },
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Sequence number assigned when the frame was applied.
    pub sequence: SequenceNumber,
    /// Mutations in encoding order (deletes first, then puts).
    pub ops: Vec<FrameOp>,
}

fn len_u32(len: usize, what: &str) -> CoreResult<u32> {
    u32::try_from(len).map_err(|_| CoreError::invalid_argument(format!("{what} too large: {len} bytes")))
}

/// Encodes a batch as one frame.
///
/// # Errors
///
/// Returns `InvalidArgument` if a key, a value or the whole frame exceeds the
/// 4-byte length fields.
pub fn encode_frame(sequence: SequenceNumber, batch: &WriteBatch) -> CoreResult<EncodedFrame> {
    let op_count = len_u32(batch.len(), "batch")?;
    let mut buf = Vec::with_capacity(HEADER_SIZE + CRC_SIZE);
    let mut spans = BTreeMap::new();

    // frame_len is patched once the body is known
    buf.extend_from_slice(&[0u8; 4]);
    buf.extend_from_slice(&FRAME_MAGIC);
    buf.extend_from_slice(&sequence.as_u64().to_le_bytes());
    buf.extend_from_slice(&op_count.to_le_bytes());

    for key in batch.deletes() {
        buf.push(OP_DELETE);
        buf.extend_from_slice(&len_u32(key.len(), "key")?.to_le_bytes());
        buf.extend_from_slice(key.as_bytes());
    }

    for (key, value) in batch.writes() {
        buf.push(OP_PUT);
        buf.extend_from_slice(&len_u32(key.len(), "key")?.to_le_bytes());
        buf.extend_from_slice(key.as_bytes());
        let value_len = len_u32(value.len(), "value")?;
        buf.extend_from_slice(&value_len.to_le_bytes());
        spans.insert(
            key.clone(),
            ValueSpan {
                offset: buf.len() as u64,
                len: value_len,
            },
        );
        buf.extend_from_slice(value);
    }

    let frame_len = len_u32(buf.len() + CRC_SIZE, "frame")?;
    buf[0..4].copy_from_slice(&frame_len.to_le_bytes());

    let crc = compute_crc32(&buf);
    buf.extend_from_slice(&crc.to_le_bytes());

    Ok(EncodedFrame { bytes: buf, spans })
}

/// Reads the length prefix of a frame.
#[must_use]
pub fn frame_len(prefix: &[u8]) -> Option<usize> {
    let bytes: [u8; 4] = prefix.get(0..4)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes) as usize)
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> CoreResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| CoreError::table_corruption("frame op extends past frame body"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> CoreResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> CoreResult<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn key(&mut self) -> CoreResult<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| CoreError::table_corruption("frame key is not valid UTF-8"))
    }
}

/// Decodes one complete frame.
///
/// # Errors
///
/// Returns `ChecksumMismatch` if the CRC does not match and
/// `TableCorruption` for a bad magic or malformed body.
pub fn decode_frame(data: &[u8]) -> CoreResult<DecodedFrame> {
    if data.len() < HEADER_SIZE + CRC_SIZE {
        return Err(CoreError::table_corruption("frame too short"));
    }

    let declared = frame_len(data).unwrap_or(0);
    if declared != data.len() {
        return Err(CoreError::table_corruption(format!(
            "frame length mismatch: declared {declared}, got {}",
            data.len()
        )));
    }

    let body_end = data.len() - CRC_SIZE;
    let stored_crc = u32::from_le_bytes([
        data[body_end],
        data[body_end + 1],
        data[body_end + 2],
        data[body_end + 3],
    ]);
    let computed_crc = compute_crc32(&data[..body_end]);
    if stored_crc != computed_crc {
        return Err(CoreError::ChecksumMismatch {
            expected: stored_crc,
            actual: computed_crc,
        });
    }

    if data[4..8] != FRAME_MAGIC {
        return Err(CoreError::table_corruption("invalid frame magic"));
    }

    let sequence = SequenceNumber::new(u64::from_le_bytes([
        data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
    ]));
    let op_count = u32::from_le_bytes([data[16], data[17], data[18], data[19]]);

    let mut cursor = Cursor {
        data: &data[..body_end],
        pos: HEADER_SIZE,
    };
    let mut ops = Vec::with_capacity(op_count as usize);

    for _ in 0..op_count {
        match cursor.u8()? {
            OP_DELETE => ops.push(FrameOp::Delete { key: cursor.key()? }),
            OP_PUT => {
                let key = cursor.key()?;
                let len = cursor.u32()?;
                let offset = cursor.pos as u64;
                cursor.take(len as usize)?;
                ops.push(FrameOp::Put {
                    key,
                    span: ValueSpan { offset, len },
                });
            }
            other => {
                return Err(CoreError::table_corruption(format!(
                    "unknown frame op kind {other}"
                )))
            }
        }
    }

    if cursor.pos != body_end {
        return Err(CoreError::table_corruption("trailing bytes in frame body"));
    }

    Ok(DecodedFrame { sequence, ops })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch() -> WriteBatch {
        let mut batch = WriteBatch::new();
        batch.put("alpha", b"one".to_vec());
        batch.put("beta", Vec::new());
        batch.delete("gamma");
        batch
    }

    #[test]
    fn encode_then_decode_locates_values() {
        let batch = sample_batch();
        let encoded = encode_frame(SequenceNumber::new(7), &batch).unwrap();
        assert_eq!(frame_len(&encoded.bytes), Some(encoded.bytes.len()));

        let decoded = decode_frame(&encoded.bytes).unwrap();
        assert_eq!(decoded.sequence, SequenceNumber::new(7));
        assert_eq!(decoded.ops.len(), 3);
        assert_eq!(
            decoded.ops[0],
            FrameOp::Delete {
                key: "gamma".into()
            }
        );

        let span = encoded.spans["alpha"];
        let start = span.offset as usize;
        assert_eq!(&encoded.bytes[start..start + span.len as usize], b"one");
        assert_eq!(
            decoded.ops[1],
            FrameOp::Put {
                key: "alpha".into(),
                span
            }
        );
    }

    #[test]
    fn empty_batch_is_a_valid_frame() {
        let encoded = encode_frame(SequenceNumber::new(1), &WriteBatch::new()).unwrap();
        assert_eq!(encoded.bytes.len(), HEADER_SIZE + CRC_SIZE);
        assert!(decode_frame(&encoded.bytes).unwrap().ops.is_empty());
    }

    #[test]
    fn flipped_byte_is_detected() {
        let mut bytes = encode_frame(SequenceNumber::new(1), &sample_batch())
            .unwrap()
            .bytes;
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        assert!(matches!(
            decode_frame(&bytes),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn truncated_frame_is_rejected() {
        let bytes = encode_frame(SequenceNumber::new(1), &sample_batch())
            .unwrap()
            .bytes;
        assert!(decode_frame(&bytes[..bytes.len() - 1]).is_err());
    }
}
