//! Storage error types

use thiserror::Error;

/// Errors surfaced by storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness or serialization guard violated (duplicate slug, stale
    /// comment ordinal)
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}
