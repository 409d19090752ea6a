//! Generic command envelope for collaborators layered above the supervisor.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Outbound command description: a kind identifier plus flat string
/// parameters.
///
/// The supervisor core never interprets these. Callers use them to describe
/// richer task semantics to a worker and decode the inbound result payload
/// (arbitrary-shape JSON carried in the task result) themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Command kind identifier.
    pub kind: String,

    /// Flat string-keyed parameters.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, String>,
}

impl Command {
    /// Create a command of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: HashMap::new(),
        }
    }

    /// Builder method to add a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}
