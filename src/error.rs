//! Error types for the analysis pipeline
//!
//! Only configuration errors and exhausted transport/protocol failures ever
//! reach the caller. Everything else degrades into a modified report.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LqaError {
    /// Missing credential or unusable settings. Never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Image fetch or backend network failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Empty body, refusal, or a payload that doesn't match the report schema
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Every model in the chain used up its retry budget
    #[error("All attempts failed: {}", attempts.join(" | "))]
    Exhausted { attempts: Vec<String> },
}

pub type LqaResult<T> = Result<T, LqaError>;

impl LqaError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Whether another attempt could plausibly succeed.
    ///
    /// A missing or unreadable local file won't appear between attempts.
    pub fn is_retryable(&self) -> bool {
        match self {
            LqaError::Config(_) | LqaError::Exhausted { .. } => false,
            LqaError::Io(err) => !matches!(
                err.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ),
            _ => true,
        }
    }
}

impl From<reqwest::Error> for LqaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LqaError::transport("request timed out")
        } else if err.is_connect() {
            LqaError::transport("could not connect to the backend")
        } else {
            LqaError::transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LqaError::config("OPENROUTER_API_KEY is not set");
        assert_eq!(
            err.to_string(),
            "Configuration error: OPENROUTER_API_KEY is not set"
        );
    }

    #[test]
    fn test_exhausted_lists_every_attempt() {
        let err = LqaError::Exhausted {
            attempts: vec!["a#1: empty".to_string(), "b#1: timeout".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "All attempts failed: a#1: empty | b#1: timeout"
        );
    }

    #[test]
    fn test_config_errors_are_not_retryable() {
        assert!(!LqaError::config("missing key").is_retryable());
        assert!(LqaError::transport("reset").is_retryable());
        assert!(LqaError::protocol("empty body").is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: LqaError = io_err.into();
        assert!(matches!(err, LqaError::Io(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_missing_file_is_not_retryable() {
        let missing = LqaError::from(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(!missing.is_retryable());
        let denied = LqaError::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(!denied.is_retryable());
        let interrupted = LqaError::from(std::io::Error::from(std::io::ErrorKind::Interrupted));
        assert!(interrupted.is_retryable());
    }
}
