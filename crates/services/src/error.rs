//! Shared error types for the services crate.

use thiserror::Error;

use learn_core::ValidationError;
use storage::repository::StorageError;

/// Errors emitted by `ProgressService`.
///
/// Validation failures happen before any repository call; storage failures
/// are passed through unchanged.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ProgressServiceError {
    /// True when the caller sent bad input (maps to a client error).
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, ProgressServiceError::Validation(_))
    }
}
