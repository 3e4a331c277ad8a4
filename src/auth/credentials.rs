use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::ApaError;

const IDENTITY_LEN: usize = 16;

/// Email/password pair used for the login handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    pub email: String,
    pub password: String,
}

impl CredentialSet {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Read `APA_EMAIL` and `APA_PASSWORD` (after loading `.env`, if present).
    pub fn from_env() -> Result<Self, ApaError> {
        let _ = dotenvy::dotenv();
        let email = require_env("APA_EMAIL")?;
        let password = require_env("APA_PASSWORD")?;
        Ok(Self { email, password })
    }

    /// Storage partition key for these credentials.
    pub fn identity(&self) -> CredentialIdentity {
        identity_of(self)
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn require_env(name: &str) -> Result<String, ApaError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ApaError::Configuration(format!(
            "Environment variable {name} not set"
        ))),
    }
}

/// Short, fixed-length key that partitions the token cache per account.
///
/// Not a secret and never sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CredentialIdentity(String);

impl CredentialIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the storage identity for a credential set.
///
/// SHA-256 over `email:password`, URL-safe base64, truncated to 16 characters
/// (96 bits).
///
/// # Example
/// ```
/// use apa_gql::auth::{identity_of, CredentialSet};
///
/// let a = identity_of(&CredentialSet::new("a@example.com", "pw"));
/// let b = identity_of(&CredentialSet::new("b@example.com", "pw"));
/// assert_ne!(a, b);
/// assert_eq!(a.as_str().len(), 16);
/// ```
pub fn identity_of(credentials: &CredentialSet) -> CredentialIdentity {
    let mut hasher = Sha256::new();
    hasher.update(credentials.email.as_bytes());
    hasher.update(b":");
    hasher.update(credentials.password.as_bytes());
    let encoded = URL_SAFE_NO_PAD.encode(hasher.finalize());
    CredentialIdentity(encoded[..IDENTITY_LEN].to_string())
}
