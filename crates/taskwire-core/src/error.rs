//! Core domain errors.

use thiserror::Error;

/// Core domain errors for Taskwire.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Result payload did not have the shape the supervisor expects.
    #[error("Malformed task result: {0}")]
    MalformedResult(String),
}
