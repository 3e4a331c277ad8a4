use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use super::cache::TokenCache;
use super::credentials::{CredentialIdentity, CredentialSet};
use super::error::AuthError;
use super::handshake::AuthHandshake;
use super::token::TokenKind;

/// Picks the cheapest path to a usable access token: cache, then refresh,
/// then full login.
///
/// Resolutions for the same identity are serialized, so concurrent callers
/// sharing this resolver log in at most once and later callers hit the cache.
/// A lock lives only while some resolution for its identity is in progress.
pub struct AccessTokenResolver {
    handshake: AuthHandshake,
    cache: TokenCache,
    flights: Mutex<HashMap<CredentialIdentity, Arc<tokio::sync::Mutex<()>>>>,
}

impl AccessTokenResolver {
    pub fn new(handshake: AuthHandshake, cache: TokenCache) -> Self {
        Self {
            handshake,
            cache,
            flights: Mutex::new(HashMap::new()),
        }
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub async fn resolve(
        &self,
        credentials: &CredentialSet,
        identity: &CredentialIdentity,
    ) -> Result<String, AuthError> {
        let flight = self.flight(identity);
        let result = {
            let _guard = flight.lock().await;
            self.resolve_serialized(credentials, identity).await
        };
        self.release(identity, flight);
        result
    }

    async fn resolve_serialized(
        &self,
        credentials: &CredentialSet,
        identity: &CredentialIdentity,
    ) -> Result<String, AuthError> {
        if let Some(record) = self.cache.get(identity, TokenKind::Access).await {
            return Ok(record.token);
        }

        if let Some(record) = self.cache.get(identity, TokenKind::Refresh).await {
            match self
                .handshake
                .generate_access_token(&record.token, identity)
                .await
            {
                Ok(token) => return Ok(token),
                Err(AuthError::RefreshTokenExpired) => {
                    debug!(%identity, "cached refresh token rejected; falling back to login");
                }
                Err(err) => return Err(err),
            }
        }

        // A freshly issued refresh token that is rejected is fatal here.
        let refresh_token = self.handshake.login(credentials, identity).await?;
        self.handshake
            .generate_access_token(&refresh_token, identity)
            .await
    }

    fn flight(&self, identity: &CredentialIdentity) -> Arc<tokio::sync::Mutex<()>> {
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(identity.clone())
            .or_default()
            .clone()
    }

    /// Forget the lock for `identity` once nobody else holds or awaits it.
    ///
    /// Callers clone the lock under the map mutex, so the count checked here
    /// cannot grow concurrently.
    fn release(&self, identity: &CredentialIdentity, flight: Arc<tokio::sync::Mutex<()>>) {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = flights
            .get(identity)
            .is_some_and(|entry| Arc::ptr_eq(entry, &flight) && Arc::strong_count(&flight) == 2);
        if idle {
            flights.remove(identity);
        }
    }

    #[cfg(test)]
    fn tracked_identities(&self) -> usize {
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
