use thiserror::Error;
use tokio::task::JoinError;

pub type Result<T, E = LinkCheckError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkCheckError {
    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("links group {0} not found")]
    GroupNotFound(u64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Report rendering failed: {0}")]
    Render(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LinkCheckError {
    /// True for both explicit cancellation and an expired deadline.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            LinkCheckError::Cancelled | LinkCheckError::DeadlineExceeded
        )
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LinkCheckError::Cancelled | LinkCheckError::DeadlineExceeded => ErrorSeverity::Low,
            LinkCheckError::GroupNotFound(_) => ErrorSeverity::Low,
            LinkCheckError::InvalidInput(_) => ErrorSeverity::Low,
            LinkCheckError::Configuration(_) => ErrorSeverity::High,
            LinkCheckError::Io(_) | LinkCheckError::Serialization(_) => ErrorSeverity::High,
            LinkCheckError::Internal(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Medium,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl From<std::io::Error> for LinkCheckError {
    fn from(err: std::io::Error) -> Self {
        LinkCheckError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LinkCheckError {
    fn from(err: serde_json::Error) -> Self {
        LinkCheckError::Serialization(err.to_string())
    }
}

impl From<JoinError> for LinkCheckError {
    fn from(err: JoinError) -> Self {
        LinkCheckError::Internal(format!("worker task failed: {err}"))
    }
}
