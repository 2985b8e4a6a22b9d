use thiserror::Error;

/// Pose buffer error types
///
/// "No data" is never an error: lookups that cannot be answered return `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoseError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for pose buffer operations
pub type PoseResult<T> = Result<T, PoseError>;
