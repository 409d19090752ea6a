//! Taskwire Supervisor
//!
//! Drives one task invocation end to end: resolve the task's executable,
//! allocate a control port, spawn the worker process with that port, relay
//! its output streams, run the readiness handshake, issue the single
//! run-task invocation, and return a [`taskwire_core::TaskResult`], all
//! under a hard wall-clock deadline with guaranteed termination of the
//! spawned process on every exit path.

pub mod client;
pub mod config;
pub mod error;
pub mod port;
pub mod relay;
pub mod supervisor;

// Re-export commonly used types
pub use client::ControlChannel;
pub use config::SupervisorConfig;
pub use error::SupervisorError;
pub use port::PortAllocator;
pub use relay::{ConsoleSink, OutputRelay, OutputSink, StreamKind};
pub use supervisor::{RunOptions, TaskSupervisor};
