//! Verify command implementation.

use arcade_core::table::verify;
use arcade_core::JsonLinesCommitLog;
use arcade_storage::FileBackend;
use std::path::Path;

const TABLE_FILE: &str = "table.dat";
const COMMIT_LOG_FILE: &str = "commits.log";

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying store at {:?}", path);
    println!();

    let table_path = path.join(TABLE_FILE);
    if !table_path.exists() {
        return Err("Table file not found".into());
    }

    let mut failed = false;

    println!("Checking table...");
    let backend = FileBackend::open(&table_path)?;
    match verify(&backend) {
        Ok(report) => {
            println!("  Frames:         {}", report.frames);
            println!("  Operations:     {}", report.ops);
            println!("  Live keys:      {}", report.live_keys);
            println!("  Last sequence:  {}", report.last_sequence);
            if report.torn_tail_bytes > 0 {
                println!(
                    "  Torn tail:      {} bytes (discarded on next open)",
                    report.torn_tail_bytes
                );
            }
        }
        Err(e) => {
            println!("  Error: {e}");
            failed = true;
        }
    }

    let log_path = path.join(COMMIT_LOG_FILE);
    if log_path.exists() {
        println!("Checking commit log...");
        match JsonLinesCommitLog::read_path(&log_path) {
            Ok(records) => println!("  Records:        {}", records.len()),
            Err(e) => {
                println!("  Error: {e}");
                failed = true;
            }
        }
    } else {
        println!("Commit log not found (this may be normal for new stores)");
    }

    println!();
    if failed {
        println!("✗ Store verification failed");
        Err("Verification failed".into())
    } else {
        println!("✓ Store verification passed");
        Ok(())
    }
}
