use thiserror::Error;

/// Rejections raised while checking a progress update or query, before any
/// repository access happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("user id is missing or invalid")]
    MissingUser,

    #[error("unsupported topic: {0}")]
    UnsupportedTopic(String),

    #[error("chapter cannot be empty")]
    EmptyChapter,

    #[error("read duration must be >= 0, got {0}")]
    NegativeReadDuration(i64),

    #[error("scroll progress must be >= 0, got {0}")]
    NegativeScrollProgress(i32),
}
