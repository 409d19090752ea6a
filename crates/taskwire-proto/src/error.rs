//! Wire-level errors.

use thiserror::Error;

/// Errors raised while encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// Message could not be encoded or decoded as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The peer closed the connection before a response arrived.
    #[error("Control connection closed")]
    ConnectionClosed,
}
