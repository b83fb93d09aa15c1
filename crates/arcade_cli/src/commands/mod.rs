//! CLI command implementations.

pub mod dump;
pub mod log;
pub mod shell;
pub mod verify;
