//! The result mapping every task invocation produces exactly once.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Result of one task invocation.
///
/// Always carries a `success` discriminant. On failure a human-readable
/// `reason` is present. Any further keys are task-defined and pass through
/// the supervisor unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Whether the task succeeded.
    pub success: bool,

    /// Human-readable failure reason, present when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Task-defined payload, opaque to the supervisor.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl TaskResult {
    /// Successful result with no extra payload.
    pub fn succeeded() -> Self {
        Self::success_with(Map::new())
    }

    /// Successful result carrying task-defined data.
    pub fn success_with(data: Map<String, Value>) -> Self {
        Self {
            success: true,
            reason: None,
            data,
        }
    }

    /// Failed result with the given reason.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
            data: Map::new(),
        }
    }

    /// Whether the task reported success.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Look up a task-defined payload value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Decode a worker response payload defensively.
    ///
    /// The payload must be a JSON object with a boolean `success` key;
    /// anything else is rejected rather than crashing the caller. Unknown
    /// keys are kept as task-defined data.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        let Value::Object(mut map) = value else {
            return Err(CoreError::MalformedResult(
                "result payload is not a JSON object".to_string(),
            ));
        };

        let success = match map.remove("success") {
            Some(Value::Bool(flag)) => flag,
            Some(other) => {
                return Err(CoreError::MalformedResult(format!(
                    "`success` is not a boolean: {other}"
                )))
            }
            None => {
                return Err(CoreError::MalformedResult(
                    "missing `success` field".to_string(),
                ))
            }
        };

        let reason = match map.remove("reason") {
            Some(Value::String(reason)) => Some(reason),
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(CoreError::MalformedResult(format!(
                    "`reason` is not a string: {other}"
                )))
            }
        };

        Ok(Self {
            success,
            reason,
            data: map,
        })
    }
}
