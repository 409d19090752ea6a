//! Supervisor errors, labeled by the phase they occurred in.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use taskwire_core::CoreError;
use taskwire_proto::WireError;

/// Errors for one supervised task invocation.
///
/// Timeout variants carry the phase in their message so a caller reading the
/// synthesized failure reason can tell which wait expired.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Resolved task executable does not exist; nothing was spawned.
    #[error("Task not found: {}", .0.display())]
    TaskNotFound(PathBuf),

    /// Every port in the probe span was taken.
    #[error("No free control port after probing {span} ports from {base}")]
    PortAllocationExhausted { base: u16, span: u16 },

    /// The OS refused to spawn the worker process.
    #[error("Failed to spawn worker process: {0}")]
    Spawn(#[source] std::io::Error),

    /// Handshake did not reach `ready` inside the connect budget.
    #[error("Timeout waiting for connection: {detail}")]
    ConnectTimeout { detail: String },

    /// Outer grace-period deadline elapsed before the worker responded.
    #[error("Timeout waiting for task completion: no result within {0:?}")]
    DeadlineExceeded(Duration),

    /// Worker reported a result but its process would not exit.
    #[error("Timeout waiting for task process to exit")]
    ExitTimeout,

    /// Connection dropped or a payload was not decodable.
    #[error("Control transport error: {0}")]
    Transport(String),
}

impl From<WireError> for SupervisorError {
    fn from(err: WireError) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<CoreError> for SupervisorError {
    fn from(err: CoreError) -> Self {
        Self::Transport(err.to_string())
    }
}
