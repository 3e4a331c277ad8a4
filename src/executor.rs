//! Authenticated query execution with a single re-authentication retry.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;

use crate::auth::{AccessTokenResolver, CredentialIdentity, CredentialSet, TokenKind};
use crate::error::Result;
use crate::transport::{GraphqlRequest, GraphqlTransport};

/// `extensions.name` value the server uses for an expired access token.
pub const TOKEN_EXPIRED: &str = "TokenExpired";

/// Re-authentication cycles allowed per execution.
const MAX_TOKEN_RETRIES: u32 = 1;

/// True when the first GraphQL error signals an expired access token.
pub fn is_token_expired(response: &Value) -> bool {
    response
        .pointer("/errors/0/extensions/name")
        .and_then(Value::as_str)
        == Some(TOKEN_EXPIRED)
}

/// Sends caller queries with the access token attached.
pub struct QueryExecutor {
    transport: Arc<dyn GraphqlTransport>,
    resolver: Arc<AccessTokenResolver>,
}

impl QueryExecutor {
    pub fn new(transport: Arc<dyn GraphqlTransport>, resolver: Arc<AccessTokenResolver>) -> Self {
        Self {
            transport,
            resolver,
        }
    }

    /// Execute `query`, re-authenticating once if the server reports the
    /// token as expired.
    ///
    /// Any other GraphQL errors are returned untouched, as is a second
    /// expiration signal after the retry.
    pub async fn execute(
        &self,
        query: &str,
        variables: &Map<String, Value>,
        access_token: &str,
        credentials: &CredentialSet,
        identity: &CredentialIdentity,
    ) -> Result<Value> {
        let mut token = access_token.to_string();
        let mut retries_left = MAX_TOKEN_RETRIES;
        loop {
            let request = GraphqlRequest::new(query, variables.clone()).with_access_token(&token);
            let response = self.transport.post(&request).await?;
            if retries_left == 0 || !is_token_expired(&response) {
                return Ok(response);
            }
            retries_left -= 1;

            warn!(%identity, "server reported expired access token; re-authenticating");
            self.resolver
                .cache()
                .delete(identity, TokenKind::Access)
                .await?;
            token = self.resolver.resolve(credentials, identity).await?;
        }
    }
}
