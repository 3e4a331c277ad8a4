//! Error types for apa-gql.

use thiserror::Error;

use crate::auth::AuthError;
use crate::transport::TransportError;

/// Primary error type for all apa-gql operations.
#[derive(Error, Debug)]
pub enum ApaError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(AuthError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Protocol,
    Network,
    Configuration,
    Storage,
    Serialization,
}

impl ApaError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Transport(_) => ErrorCategory::Network,
            Self::Authentication(inner) => match inner {
                AuthError::ProtocolViolation(_) => ErrorCategory::Protocol,
                AuthError::Transport(_) => ErrorCategory::Network,
                AuthError::Store(_) => ErrorCategory::Storage,
                AuthError::Serialization(_) => ErrorCategory::Serialization,
                AuthError::AuthenticationDenied { .. } | AuthError::RefreshTokenExpired => {
                    ErrorCategory::Authentication
                }
            },
        }
    }

    /// Whether this error is potentially retryable by the caller.
    ///
    /// The session layer itself never retries transport failures.
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Network
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ApaError>;
