//! Store directory management.
//!
//! An on-disk store is a directory:
//!
//! ```text
//! <store_path>/
//! ├─ LOCK              # Advisory lock, one process at a time
//! ├─ table.dat         # Frames of the durable table
//! └─ commits.log       # JSON-lines commit log
//! ```

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const TABLE_FILE: &str = "table.dat";
const COMMIT_LOG_FILE: &str = "commits.log";

/// A store directory, exclusively locked for as long as this value lives.
#[derive(Debug)]
pub struct StoreDir {
    path: PathBuf,
    _lock_file: File,
}

impl StoreDir {
    /// Opens or creates a store directory and takes its lock.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory is missing and `create_if_missing` is false
    /// - The store already exists and `error_if_exists` is true
    /// - Another process holds the lock (`StoreLocked`)
    pub fn open(path: &Path, config: &Config) -> CoreResult<Self> {
        if path.exists() {
            if !path.is_dir() {
                return Err(CoreError::invalid_format(format!(
                    "path is not a directory: {}",
                    path.display()
                )));
            }
            if config.error_if_exists && path.join(TABLE_FILE).exists() {
                return Err(CoreError::invalid_format(format!(
                    "store already exists: {}",
                    path.display()
                )));
            }
        } else if config.create_if_missing {
            fs::create_dir_all(path)?;
        } else {
            return Err(CoreError::invalid_format(format!(
                "store directory does not exist: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(CoreError::StoreLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path to the table file.
    #[must_use]
    pub fn table_path(&self) -> PathBuf {
        self.path.join(TABLE_FILE)
    }

    /// Returns the path to the commit log.
    #[must_use]
    pub fn commit_log_path(&self) -> PathBuf {
        self.path.join(COMMIT_LOG_FILE)
    }
}
