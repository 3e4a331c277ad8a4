//! Caller-facing session client and sequential batch runner.

use std::sync::Arc;
use std::time::Duration;

use bon::bon;
use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::auth::{
    AccessTokenResolver, AuthHandshake, CredentialSet, KeyValueStore, TokenCache, TokenKind,
    DEFAULT_ACCESS_TOKEN_TTL,
};
use crate::config::ApaConfig;
use crate::error::Result;
use crate::executor::QueryExecutor;
use crate::transport::{GraphqlTransport, HttpTransport};

/// One query in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryItem {
    pub query: String,
    pub variables: Map<String, Value>,
}

impl QueryItem {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: Map::new(),
        }
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }
}

/// Build a variables mapping from name/value pairs; later names win.
///
/// # Example
/// ```
/// use apa_gql::client::variables_from_pairs;
///
/// let vars = variables_from_pairs([("id", "1"), ("id", "2")]);
/// assert_eq!(vars["id"], "2");
/// ```
pub fn variables_from_pairs<I, K, V>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), Value::String(value.into())))
        .collect()
}

/// How a batch reacts to a failed item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Record `{"error": message}` for a failed item and keep going.
    pub continue_on_fail: bool,
}

/// What is cached for a credential set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub has_refresh_token: bool,
    pub access_token_expires_at: Option<DateTime<Utc>>,
}

/// Authenticated GraphQL client over a shared token store.
///
/// Share one instance (behind an `Arc`) across concurrent executions so
/// per-identity login serialization applies.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use apa_gql::auth::{CredentialSet, InMemoryKeyValueStore};
/// use apa_gql::client::SessionClient;
/// use apa_gql::config::ApaConfig;
///
/// # async fn example() -> apa_gql::error::Result<()> {
/// let client = SessionClient::from_config(&ApaConfig::default(), Arc::new(InMemoryKeyValueStore::new()))?;
/// let creds = CredentialSet::new("player@example.com", "secret");
/// let response = client.query(&creds, "query { viewer { id } }", &Default::default()).await?;
/// println!("{response}");
/// # Ok(())
/// # }
/// ```
pub struct SessionClient {
    cache: TokenCache,
    resolver: Arc<AccessTokenResolver>,
    executor: QueryExecutor,
}

#[bon]
impl SessionClient {
    #[builder]
    pub fn new(
        transport: Arc<dyn GraphqlTransport>,
        store: Arc<dyn KeyValueStore>,
        #[builder(default = DEFAULT_ACCESS_TOKEN_TTL)] access_token_ttl: Duration,
    ) -> Self {
        let cache = TokenCache::new(store).with_access_ttl(access_token_ttl);
        let handshake = AuthHandshake::new(transport.clone(), cache.clone());
        let resolver = Arc::new(AccessTokenResolver::new(handshake, cache.clone()));
        let executor = QueryExecutor::new(transport, resolver.clone());
        Self {
            cache,
            resolver,
            executor,
        }
    }
}

impl SessionClient {
    /// HTTP-backed client for the configured endpoint.
    pub fn from_config(config: &ApaConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.endpoint.clone(), config.request_timeout)?;
        Ok(Self::builder()
            .transport(Arc::new(transport))
            .store(store)
            .access_token_ttl(config.access_token_ttl)
            .build())
    }

    /// Resolve a token for `credentials` and run one query.
    ///
    /// The returned value is the raw GraphQL response, including any
    /// non-token GraphQL errors.
    pub async fn query(
        &self,
        credentials: &CredentialSet,
        query: &str,
        variables: &Map<String, Value>,
    ) -> Result<Value> {
        let identity = credentials.identity();
        let token = self.resolver.resolve(credentials, &identity).await?;
        self.executor
            .execute(query, variables, &token, credentials, &identity)
            .await
    }

    /// Run items one after another, preserving input order.
    pub async fn run_batch(
        &self,
        credentials: &CredentialSet,
        items: &[QueryItem],
        policy: BatchPolicy,
    ) -> Result<Vec<Value>> {
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match self.query(credentials, &item.query, &item.variables).await {
                Ok(response) => results.push(response),
                Err(err) if policy.continue_on_fail => {
                    warn!(item = index, error = %err, "batch item failed; continuing");
                    results.push(json!({ "error": err.to_string() }));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(results)
    }

    pub async fn status(&self, credentials: &CredentialSet) -> SessionStatus {
        let identity = credentials.identity();
        let refresh = self.cache.get(&identity, TokenKind::Refresh).await;
        let access = self.cache.get(&identity, TokenKind::Access).await;
        SessionStatus {
            has_refresh_token: refresh.is_some(),
            access_token_expires_at: access.and_then(|record| record.expires_at),
        }
    }

    /// Forget both cached tokens for `credentials`.
    pub async fn logout(&self, credentials: &CredentialSet) -> Result<()> {
        self.cache.clear_all(&credentials.identity()).await?;
        Ok(())
    }
}
