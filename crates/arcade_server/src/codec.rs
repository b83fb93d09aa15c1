//! JSON values stored as CBOR bytes.
//!
//! The store treats values as opaque bytes. The server accepts arbitrary
//! JSON and keeps it as CBOR so reads give back the same JSON value.

use crate::error::{ServerError, ServerResult};
use serde_json::Value;

/// Encodes a JSON value for storage.
///
/// # Errors
///
/// Returns `Codec` if the value cannot be serialized.
pub fn encode_value(value: &Value) -> ServerResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes)
        .map_err(|e| ServerError::Codec(e.to_string()))?;
    Ok(bytes)
}

/// Decodes a stored value back to JSON.
///
/// # Errors
///
/// Returns `Codec` if the bytes are not a CBOR encoding of a JSON value.
pub fn decode_value(bytes: &[u8]) -> ServerResult<Value> {
    ciborium::de::from_reader(bytes).map_err(|e| ServerError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_value_survives() {
        let value = json!({"name": "pac", "scores": [1, 2.5, null], "alive": true});
        let bytes = encode_value(&value).unwrap();
        assert_eq!(decode_value(&bytes).unwrap(), value);
    }

    #[test]
    fn object_keys_encode_in_order() {
        let a = encode_value(&json!({"b": 1, "a": 2})).unwrap();
        let b = encode_value(&json!({"a": 2, "b": 1})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn garbage_is_a_codec_error() {
        assert!(matches!(
            decode_value(&[0xff, 0x00]),
            Err(ServerError::Codec(_))
        ));
    }
}
