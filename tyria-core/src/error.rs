//! Core error types for Tyria.

use thiserror::Error;

/// Core error type for Tyria models.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A string could not be parsed as an item identifier.
    #[error("Invalid item id: {0:?}")]
    InvalidId(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
