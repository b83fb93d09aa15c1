//! # Arcade Server
//!
//! Serving layer for the arcade key-value store.
//!
//! This crate provides:
//! - A session registry mapping external ids to [`arcade_core::Session`]s,
//!   with idle expiry and explicit close
//! - JSON request and response messages
//! - A request handler translating store errors into client or server
//!   errors
//!
//! Values arrive as JSON and are stored as CBOR bytes; the store itself
//! never looks inside them.
//!
//! # Example
//!
//! ```
//! use arcade_core::Store;
//! use arcade_server::{KvServer, Request, ServerConfig};
//!
//! let store = Store::open_in_memory().unwrap();
//! let server = KvServer::new(&store, ServerConfig::default());
//!
//! let session = server.handle(Request::CreateSession).session.unwrap();
//! server.handle(Request::Begin { session: session.clone() });
//! let reply = server.handle(Request::Commit { session });
//! assert_eq!(reply.depth, Some(0));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod codec;
mod config;
mod error;
mod handler;
mod protocol;
mod registry;
mod server;

pub use codec::{decode_value, encode_value};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::RequestHandler;
pub use protocol::{Request, Response};
pub use registry::{SessionEntry, SessionRegistry};
pub use server::KvServer;
