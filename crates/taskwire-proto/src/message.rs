//! Control requests and the readiness sentinel.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::WireError;

/// Literal line a worker sends in response to a ready-check.
pub const READY_SENTINEL: &str = "ready";

/// Operations a supervisor can invoke on a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Probe whether the worker's control listener is up.
    ReadyCheck,
    /// Execute the task and report its result.
    RunTask,
}

/// A single control request sent to a worker.
///
/// Requests carry no body beyond the operation name; the id and timestamp
/// exist for correlation in logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlRequest {
    /// Request id, unique per request.
    pub id: String,

    /// Operation to perform.
    pub op: Operation,

    /// Client-side send time in epoch milliseconds.
    pub timestamp_ms: i64,
}

impl ControlRequest {
    /// Create a request for the given operation.
    pub fn new(op: Operation) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            op,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }

    /// Encode as a single wire line (no trailing newline).
    pub fn encode(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode one wire line.
    pub fn decode(line: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_names_operation_on_the_wire() {
        let line = ControlRequest::new(Operation::ReadyCheck).encode().unwrap();
        assert!(line.contains("\"ready_check\""));

        let line = ControlRequest::new(Operation::RunTask).encode().unwrap();
        assert!(line.contains("\"run_task\""));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = ControlRequest::new(Operation::RunTask);
        let b = ControlRequest::new(Operation::RunTask);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(ControlRequest::decode("not json").is_err());
        assert!(ControlRequest::decode("{\"op\":\"reboot\"}").is_err());
    }
}
