//! Login handshake: credentials -> device refresh token -> refresh token -> access token.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::cache::TokenCache;
use super::credentials::{CredentialIdentity, CredentialSet};
use super::error::AuthError;
use super::token::TokenKind;
use crate::transport::{GraphqlRequest, GraphqlTransport};

pub const LOGIN_MUTATION: &str = r#"
mutation login($username: String!, $password: String!) {
  login(input: {username: $username, password: $password}) {
    __typename
    ... on SuccessLoginPayload {
      deviceRefreshToken
      __typename
    }
    ... on PartialSuspendedLoginPayload {
      leagueIds
      deviceRefreshToken
      __typename
    }
    ... on DeniedLoginPayload {
      reason
      __typename
    }
  }
}
"#;

pub const AUTHORIZE_MUTATION: &str = r#"
mutation authorize($deviceRefreshToken: String!) {
  authorize(deviceRefreshToken: $deviceRefreshToken) {
    refreshToken
    __typename
  }
}
"#;

pub const GENERATE_ACCESS_TOKEN_MUTATION: &str = r#"
mutation GenerateAccessTokenMutation($refreshToken: String!) {
  generateAccessToken(refreshToken: $refreshToken) {
    accessToken
    __typename
  }
}
"#;

const DENIED_LOGIN_PAYLOAD: &str = "DeniedLoginPayload";
const PARTIAL_SUSPENDED_LOGIN_PAYLOAD: &str = "PartialSuspendedLoginPayload";

/// The `login` field of a login response. Only a denial is recognized by
/// type; every other shape is judged by whether it carries a device token.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginPayload {
    #[serde(rename = "__typename")]
    typename: Option<String>,
    device_refresh_token: Option<String>,
    reason: Option<String>,
    league_ids: Option<Vec<Value>>,
}

/// Runs the three-call login protocol and writes results through the cache.
///
/// Holds no state of its own.
#[derive(Clone)]
pub struct AuthHandshake {
    transport: Arc<dyn GraphqlTransport>,
    cache: TokenCache,
}

impl AuthHandshake {
    pub fn new(transport: Arc<dyn GraphqlTransport>, cache: TokenCache) -> Self {
        Self { transport, cache }
    }

    /// Log in and exchange the single-use device token for a refresh token.
    ///
    /// The device token is never stored; the refresh token is.
    pub async fn login(
        &self,
        credentials: &CredentialSet,
        identity: &CredentialIdentity,
    ) -> Result<String, AuthError> {
        info!(%identity, "logging in");
        let request = GraphqlRequest::new(
            LOGIN_MUTATION,
            variables([
                ("username", json!(credentials.email)),
                ("password", json!(credentials.password)),
            ]),
        );
        let response = self.transport.post(&request).await?;
        let device_refresh_token = device_refresh_token(identity, &response)?;

        let request = GraphqlRequest::new(
            AUTHORIZE_MUTATION,
            variables([("deviceRefreshToken", json!(device_refresh_token))]),
        );
        let response = self.transport.post(&request).await?;
        let refresh_token = string_at(&response, "/data/authorize/refreshToken").ok_or_else(|| {
            AuthError::ProtocolViolation(with_errors(
                "authorize response missing refreshToken",
                &response,
            ))
        })?;

        self.cache
            .set(identity, TokenKind::Refresh, &refresh_token)
            .await?;
        Ok(refresh_token)
    }

    /// Exchange a refresh token for an access token and cache it with a TTL.
    ///
    /// A response without an access token means the refresh token is no
    /// longer accepted: both cached tokens are cleared and
    /// [`AuthError::RefreshTokenExpired`] is returned.
    pub async fn generate_access_token(
        &self,
        refresh_token: &str,
        identity: &CredentialIdentity,
    ) -> Result<String, AuthError> {
        let request = GraphqlRequest::new(
            GENERATE_ACCESS_TOKEN_MUTATION,
            variables([("refreshToken", json!(refresh_token))]),
        );
        let response = self.transport.post(&request).await?;
        let Some(access_token) = string_at(&response, "/data/generateAccessToken/accessToken")
        else {
            warn!(%identity, "refresh token rejected; clearing cached tokens");
            if let Err(err) = self.cache.clear_all(identity).await {
                warn!(%identity, error = %err, "failed to clear cached tokens");
            }
            return Err(AuthError::RefreshTokenExpired);
        };

        self.cache
            .set(identity, TokenKind::Access, &access_token)
            .await?;
        info!(%identity, "generated access token");
        Ok(access_token)
    }
}

fn device_refresh_token(identity: &CredentialIdentity, response: &Value) -> Result<String, AuthError> {
    let payload = response
        .pointer("/data/login")
        .filter(|login| login.is_object())
        .map(|login| serde_json::from_value::<LoginPayload>(login.clone()))
        .transpose()
        .ok()
        .flatten()
        .unwrap_or_default();

    match payload.typename.as_deref() {
        Some(DENIED_LOGIN_PAYLOAD) => {
            return Err(AuthError::AuthenticationDenied {
                reason: payload
                    .reason
                    .unwrap_or_else(|| "no reason given".to_string()),
            });
        }
        Some(PARTIAL_SUSPENDED_LOGIN_PAYLOAD) => {
            warn!(
                %identity,
                suspended_leagues = payload.league_ids.as_ref().map_or(0, Vec::len),
                "account is partially suspended"
            );
        }
        _ => {}
    }

    payload
        .device_refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            AuthError::ProtocolViolation(with_errors(
                "login response missing deviceRefreshToken",
                response,
            ))
        })
}

fn variables<const N: usize>(pairs: [(&str, Value); N]) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

fn string_at(response: &Value, pointer: &str) -> Option<String> {
    response
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Append the first GraphQL error message, if the server sent one.
fn with_errors(message: &str, response: &Value) -> String {
    match response.pointer("/errors/0/message").and_then(Value::as_str) {
        Some(detail) => format!("{message} ({detail})"),
        None => message.to_string(),
    }
}
