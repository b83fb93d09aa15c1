//! # Arcade Storage
//!
//! Byte-level storage backends for the arcade key-value store.
//!
//! Backends are **opaque byte stores**: they append, read and truncate
//! bytes and know nothing about the frame format the table engine writes
//! on top of them.
//!
//! ## Design Principles
//!
//! - Backends are simple byte stores (read, append, flush, truncate)
//! - No knowledge of frames, keys or values
//! - Must be `Send + Sync` for concurrent access
//! - Any number of independent handles can be opened onto the same bytes,
//!   so every pooled connection reads through its own handle
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral stores
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use arcade_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! let reader = backend.open_handle().unwrap();
//! assert_eq!(reader.read_at(offset, 5).unwrap(), b"hello");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
