//! Taskwire control-protocol messages.
//!
//! The supervisor and its workers exchange single lines over a local TCP
//! connection: requests are one-line JSON objects naming an operation,
//! responses are either the literal `ready` line (ready-check) or one JSON
//! object holding the task result (run-task). This crate defines those
//! messages plus the generic [`Command`] envelope callers layered above the
//! supervisor use to describe richer task semantics.

pub mod command;
pub mod error;
pub mod message;

// Re-export commonly used types
pub use command::Command;
pub use error::WireError;
pub use message::{ControlRequest, Operation, READY_SENTINEL};
