use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use super::credentials::CredentialIdentity;
use super::error::AuthError;
use super::store::KeyValueStore;
use super::token::{TokenKind, TokenRecord};

/// Access tokens live 15 minutes server-side; expire them a minute early.
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(14 * 60);

/// Storage key for a token kind and identity, e.g. `access_Xy12...`.
pub fn token_key(kind: TokenKind, identity: &CredentialIdentity) -> String {
    format!("{kind}_{identity}")
}

/// Expiry-aware view of the keyed store, partitioned by kind and identity.
///
/// Reads never fail: an unreadable or malformed entry is reported as absent so
/// callers can always fall through to re-authentication.
#[derive(Clone)]
pub struct TokenCache {
    store: Arc<dyn KeyValueStore>,
    access_ttl: Duration,
}

impl TokenCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            access_ttl: DEFAULT_ACCESS_TOKEN_TTL,
        }
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Return the stored record, or `None` if absent, unreadable, or an
    /// expired access token. Expired access tokens are deleted.
    pub async fn get(&self, identity: &CredentialIdentity, kind: TokenKind) -> Option<TokenRecord> {
        let key = token_key(kind, identity);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(%identity, %kind, "token cache miss");
                return None;
            }
            Err(err) => {
                warn!(%identity, %kind, error = %err, "token store read failed; treating as miss");
                return None;
            }
        };
        let record: TokenRecord = match serde_json::from_value(raw) {
            Ok(record) => record,
            Err(err) => {
                warn!(%identity, %kind, error = %err, "malformed token record; treating as miss");
                return None;
            }
        };
        if record.token.is_empty() {
            return None;
        }
        if kind == TokenKind::Access && record.is_expired_at(Utc::now()) {
            debug!(%identity, "cached access token expired");
            if let Err(err) = self.delete(identity, kind).await {
                warn!(%identity, error = %err, "failed to delete expired access token");
            }
            return None;
        }
        debug!(%identity, %kind, "token cache hit");
        Some(record)
    }

    /// Store a token, overwriting any previous one. Access tokens are stamped
    /// with `now + ttl`; refresh tokens carry no expiry.
    pub async fn set(
        &self,
        identity: &CredentialIdentity,
        kind: TokenKind,
        token: &str,
    ) -> Result<TokenRecord, AuthError> {
        let record = match kind {
            TokenKind::Refresh => TokenRecord::new(token),
            TokenKind::Access => {
                let expires_at = chrono::Duration::from_std(self.access_ttl)
                    .ok()
                    .and_then(|ttl| Utc::now().checked_add_signed(ttl))
                    .ok_or_else(|| {
                        AuthError::Store("access token TTL is out of range".to_string())
                    })?;
                TokenRecord::expiring_at(token, expires_at)
            }
        };
        self.store
            .set(&token_key(kind, identity), serde_json::to_value(&record)?)
            .await?;
        Ok(record)
    }

    pub async fn delete(&self, identity: &CredentialIdentity, kind: TokenKind) -> Result<(), AuthError> {
        self.store.delete(&token_key(kind, identity)).await
    }

    /// Drop both tokens for an identity.
    pub async fn clear_all(&self, identity: &CredentialIdentity) -> Result<(), AuthError> {
        self.delete(identity, TokenKind::Refresh).await?;
        self.delete(identity, TokenKind::Access).await
    }
}
