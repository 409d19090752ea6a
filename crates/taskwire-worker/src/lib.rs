//! Taskwire Worker Harness
//!
//! Task executables link this crate, register a [`TaskHandler`], and call
//! [`serve`]. The harness owns the worker side of the startup contract:
//! bind the control port given on the command line, answer ready-checks
//! with the literal `ready` line, run the task exactly once on the run-task
//! operation, report its result as one JSON line, then return so the
//! process can exit.

pub mod harness;

// Re-export commonly used types
pub use harness::{serve, TaskHandler, WorkerError};
