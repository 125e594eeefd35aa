//! Error types for GitFerry

use thiserror::Error;

/// Result type alias for GitFerry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for GitFerry operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bad or insufficient credentials; fatal, aborts before expensive work
    #[error("authentication error: {0}")]
    Auth(String),

    /// Rate limit exhausted after retries
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    /// Git clone/push/timeout failure
    #[error("git operation failed: {0}")]
    Git(String),

    /// Transient HTTP transport or 5xx failure; candidate for retry
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic orchestration failure
    #[error("migration error: {0}")]
    Migration(String),
}

impl Error {
    /// Whether a retry with backoff is worthwhile.
    ///
    /// Only transient transport failures and rate-limit responses qualify;
    /// authentication and validation failures never do.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Http(_) | Error::RateLimited(_))
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Error::Git(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::Http("503".to_string()).is_transient());
        assert!(Error::RateLimited("429".to_string()).is_transient());
        assert!(!Error::Auth("bad token".to_string()).is_transient());
        assert!(!Error::Migration("missing repo".to_string()).is_transient());
        assert!(!Error::Git("clone failed".to_string()).is_transient());
    }
}
