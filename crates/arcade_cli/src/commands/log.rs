//! Log command implementation.

use arcade_core::{CommitRecord, JsonLinesCommitLog};
use std::path::Path;

const COMMIT_LOG_FILE: &str = "commits.log";

/// Runs the log command.
///
/// Reads the log file directly, so it works while another process holds
/// the store open.
pub fn run(path: &Path, limit: Option<usize>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let log_path = path.join(COMMIT_LOG_FILE);
    if !log_path.exists() {
        return Err("Commit log not found".into());
    }

    let records = JsonLinesCommitLog::read_path(&log_path)?;
    let skip = limit.map_or(0, |n| records.len().saturating_sub(n));

    for record in &records[skip..] {
        match format {
            "json" => println!("{}", serde_json::to_string(record)?),
            _ => println!("{}", describe(record)),
        }
    }

    Ok(())
}

fn describe(record: &CommitRecord) -> String {
    let writes: Vec<&str> = record.writes.keys().map(String::as_str).collect();
    let deletes: Vec<&str> = record.deletes.iter().map(String::as_str).collect();
    format!(
        "{} {:>8} {:<11} {:<20} writes={:?} deletes={:?}",
        record.timestamp.to_rfc3339(),
        record.sequence.to_string(),
        record.kind.to_string(),
        record.origin,
        writes,
        deletes
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::{CommitKind, SequenceNumber, WriteBatch};

    #[test]
    fn describe_lists_keys() {
        let mut batch = WriteBatch::new();
        batch.put("a", b"1".to_vec());
        batch.delete("b");
        let record = CommitRecord::new("main", CommitKind::Transaction, SequenceNumber::new(4), &batch);

        let line = describe(&record);
        assert!(line.contains("seq:4"));
        assert!(line.contains("transaction"));
        assert!(line.contains(r#"writes=["a"]"#));
        assert!(line.contains(r#"deletes=["b"]"#));
    }
}
