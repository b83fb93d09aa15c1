//! # Arcade Core
//!
//! Sessions with nested transactions over a durable key-value table.
//!
//! This crate provides:
//! - A durable single-table store written as checksummed frames, one frame
//!   per flush, so every batch is all-or-nothing
//! - A connection pool giving each concurrent caller its own table handle
//! - [`Session`]s holding a stack of [`TransactionLayer`]s, with
//!   innermost-wins reads and merge-on-commit
//! - An append-only commit log of every flush
//!
//! ## Example
//!
//! ```rust
//! use arcade_core::Store;
//!
//! let store = Store::open_in_memory().unwrap();
//! let mut session = store.new_session();
//!
//! session.set("k", b"v".to_vec()).unwrap();
//! session.begin();
//! session.delete("k").unwrap();
//! assert_eq!(session.get("k").unwrap(), None);
//! session.commit().unwrap();
//!
//! assert_eq!(store.get("k").unwrap(), None);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
pub mod commit_log;
mod config;
mod dir;
mod error;
pub mod session;
mod stats;
mod store;
pub mod table;
mod types;

pub use batch::WriteBatch;
pub use commit_log::{CommitLogSink, CommitRecord, JsonLinesCommitLog, MemoryCommitLog};
pub use config::Config;
pub use dir::StoreDir;
pub use error::{CoreError, CoreResult};
pub use session::{Applied, FlushReport, Session, TransactionLayer};
pub use stats::{StatsSnapshot, StoreStats};
pub use store::Store;
pub use table::{BackingStore, VerifyReport};
pub use types::{CommitKind, SequenceNumber};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
