use thiserror::Error;

use crate::error::ApaError;
use crate::transport::TransportError;

/// Failures of the login handshake and token lifecycle.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The server rejected the credentials; carries its reason verbatim.
    #[error("Login failed: {reason}")]
    AuthenticationDenied { reason: String },
    /// The server accepted the request but omitted a field the protocol requires.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
    #[error("Failed to generate access token - refresh token may be expired")]
    RefreshTokenExpired,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Token store error: {0}")]
    Store(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Store(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<AuthError> for ApaError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Transport(inner) => ApaError::Transport(inner),
            other => ApaError::Authentication(other),
        }
    }
}
