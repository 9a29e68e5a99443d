// shared/src/lib.rs

/// Errors surfaced by the cache, the coordinators and the remote client.
///
/// Every variant owns plain data so a single fetch outcome can be cloned out to
/// each caller waiting on the same query.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("not found")]
    NotFound,
    #[error("transport: {0}")]
    Transport(String),
    #[error("server returned status {code}: {message}")]
    Status { code: u16, message: String },
    #[error("validation: {0}")]
    Validation(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    /// Transport and status failures get one automatic retry; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Status { .. })
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod config;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_remote_failures_are_retryable() {
        assert!(Error::Transport("connection reset".into()).is_retryable());
        assert!(
            Error::Status {
                code: 503,
                message: "unavailable".into()
            }
            .is_retryable()
        );
        assert!(!Error::NotFound.is_retryable());
        assert!(!Error::validation("quantity must be at least 1").is_retryable());
        assert!(!Error::Decode("expected array".into()).is_retryable());
    }

    #[test]
    fn test_status_error_message() {
        let err = Error::Status {
            code: 500,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "server returned status 500: boom");
    }
}
