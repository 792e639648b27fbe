//! Store-level error types.

use thiserror::Error;

/// Errors surfaced by a [`crate::TableStore`] backend.
///
/// Only unprocessed items within a *successful* batch-write response are
/// retried by the writer; every variant here is fatal to the run.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed (connection refused, timeout, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Error declared by the backend in its response envelope.
    #[error("{code}: {message}")]
    Api { code: String, message: String },

    /// Response body could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Returns `true` if the backend reported the table as absent.
    pub fn is_resource_not_found(&self) -> bool {
        matches!(self, Self::Api { code, .. } if code == "ResourceNotFoundException")
    }
}
