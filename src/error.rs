//! WolfKV Error Types

use axum::http::StatusCode;
use thiserror::Error;

/// Result type alias for WolfKV operations
pub type Result<T> = std::result::Result<T, Error>;

/// WolfKV error types
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // Client input errors
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid replica selector: {0}")]
    InvalidReplica(String),

    #[error("Invalid write quorum {requested}: must be between 1 and {max}")]
    InvalidQuorum { requested: usize, max: usize },

    #[error("Key not found: {0}")]
    NotFound(String),

    // WAL errors
    #[error("WAL error: {0}")]
    Wal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Replication errors
    #[error("Quorum not reached before timeout: {acks}/{required} acknowledgments")]
    QuorumTimeout { acks: usize, required: usize },

    #[error("Replication error: {0}")]
    Replication(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::QuorumTimeout { .. } | Error::Replication(_) | Error::Network(_)
        )
    }

    /// Client input errors never touch replica state
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRequest(_)
                | Error::InvalidKey(_)
                | Error::InvalidReplica(_)
                | Error::InvalidQuorum { .. }
                | Error::NotFound(_)
        )
    }

    /// Short machine-readable code used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) | Error::ConfigParse(_) => "config",
            Error::InvalidRequest(_) => "invalid_request",
            Error::InvalidKey(_) => "invalid_key",
            Error::InvalidReplica(_) => "invalid_replica",
            Error::InvalidQuorum { .. } => "invalid_quorum",
            Error::NotFound(_) => "not_found",
            Error::Wal(_) | Error::Io(_) | Error::Serialization(_) => "durability",
            Error::QuorumTimeout { .. } => "quorum_timeout",
            Error::Replication(_) => "replication",
            Error::Network(_) => "network",
            Error::Internal(_) => "internal",
        }
    }

    /// Convert to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidRequest(_)
            | Error::InvalidKey(_)
            | Error::InvalidReplica(_)
            | Error::InvalidQuorum { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::QuorumTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::Replication(_) | Error::Network(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            Error::InvalidQuorum { requested: 4, max: 3 }.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::QuorumTimeout { acks: 1, required: 3 }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(Error::NotFound("k".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::InvalidRequest("bad json".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Wal("disk full".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_timeout_is_not_a_durability_error() {
        let timeout = Error::QuorumTimeout { acks: 2, required: 3 };
        assert!(timeout.is_retryable());
        assert!(!timeout.is_client_error());
        assert_ne!(timeout.code(), Error::Wal("x".into()).code());
    }
}
