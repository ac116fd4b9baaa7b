use thiserror::Error;

/// Stride tracker error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackerError {
    #[error("Session already running")]
    AlreadyRunning,

    #[error("Session not running")]
    NotRunning,

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for pipeline operations
pub type TResult<T> = Result<T, TrackerError>;

impl From<std::io::Error> for TrackerError {
    fn from(err: std::io::Error) -> Self {
        TrackerError::StorageError(err.to_string())
    }
}

impl TrackerError {
    /// Whether the error comes from a state machine misuse rather than data
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            TrackerError::AlreadyRunning | TrackerError::NotRunning | TrackerError::IllegalState(_)
        )
    }
}
