//! Error types for postgate.

use thiserror::Error;

/// Common error type for postgate.
#[derive(Error, Debug)]
pub enum PostgateError {
    /// Database error.
    ///
    /// Wraps errors from sqlx; converted automatically.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Outbound chat API error.
    #[error("chat API error: {0}")]
    Chat(String),

    /// MIME parse error.
    #[error("mail parse error: {0}")]
    Parse(String),

    /// Mail server error.
    #[error("mail server error: {0}")]
    Server(String),

    /// The serialization authority has shut down and no longer answers
    /// resolve/deliver requests.
    #[error("authority unavailable")]
    AuthorityClosed,
}

// Conversion from sqlx errors
impl From<sqlx::Error> for PostgateError {
    fn from(e: sqlx::Error) -> Self {
        PostgateError::Database(e.to_string())
    }
}

/// Result type alias for postgate operations.
pub type Result<T> = std::result::Result<T, PostgateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_display() {
        let err = PostgateError::Database("locked".to_string());
        assert_eq!(err.to_string(), "database error: locked");
    }

    #[test]
    fn test_config_error_display() {
        let err = PostgateError::Config("bot_token is not set".to_string());
        assert_eq!(err.to_string(), "configuration error: bot_token is not set");
    }

    #[test]
    fn test_chat_error_display() {
        let err = PostgateError::Chat("timeout".to_string());
        assert_eq!(err.to_string(), "chat API error: timeout");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PostgateError = io_err.into();
        assert!(matches!(err, PostgateError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_authority_closed_display() {
        assert_eq!(
            PostgateError::AuthorityClosed.to_string(),
            "authority unavailable"
        );
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(PostgateError::Parse("truncated".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
