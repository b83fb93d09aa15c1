//! Dump command implementation.

use arcade_core::Store;
use arcade_server::decode_value;
use serde_json::Value;
use std::path::Path;

/// Renders a stored value as JSON, or as hex if it is not a JSON value.
fn render(bytes: &[u8]) -> Value {
    decode_value(bytes).unwrap_or_else(|_| Value::String(format!("0x{}", hex::encode(bytes))))
}

/// Runs the dump command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::open(path)?;
    let rows = store.dump()?;

    match format {
        "json" => {
            let map: serde_json::Map<String, Value> = rows
                .iter()
                .map(|(key, bytes)| (key.clone(), render(bytes)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&map)?);
        }
        _ => {
            println!("{} rows (last sequence {})", rows.len(), store.last_sequence());
            for (key, bytes) in &rows {
                println!("{key} = {}", render(bytes));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_server::encode_value;
    use serde_json::json;

    #[test]
    fn renders_json_and_raw_bytes() {
        let bytes = encode_value(&json!({"a": 1})).unwrap();
        assert_eq!(render(&bytes), json!({"a": 1}));
        assert_eq!(render(&[0xff]), json!("0xff"));
    }
}
