use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error reported by the hosted provider.
///
/// Passed through unmodified; no local error kinds are layered on top.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{name}: {message}")]
pub struct ErrorInfo {
    /// Human readable message, shown verbatim to the end user.
    pub message: String,

    /// Provider error class (e.g. "AuthApiError").
    pub name: String,
}

impl ErrorInfo {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            name: name.into(),
        }
    }
}
