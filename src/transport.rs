//! GraphQL-over-HTTP transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Header carrying the access token on data requests.
pub const AUTHENTICATE_HEADER: &str = "authenticate";

/// Transport-level failures, distinct from GraphQL errors in a response body.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response body: {0}")]
    Decode(String),
}

/// A single GraphQL POST.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphqlRequest {
    pub query: String,
    pub variables: Map<String, Value>,
    pub access_token: Option<String>,
}

impl GraphqlRequest {
    pub fn new(query: impl Into<String>, variables: Map<String, Value>) -> Self {
        Self {
            query: query.into(),
            variables,
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// JSON body in the standard `{query, variables}` shape.
    pub fn body(&self) -> Value {
        serde_json::to_value(GraphqlBody {
            query: &self.query,
            variables: &self.variables,
        })
        .unwrap_or(Value::Null)
    }
}

#[derive(Serialize)]
struct GraphqlBody<'a> {
    query: &'a str,
    variables: &'a Map<String, Value>,
}

/// Sends GraphQL requests to a single fixed endpoint.
///
/// Implementations must return `Err` only for transport failures; a response
/// whose body carries a GraphQL `errors` list is still `Ok`.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn post(&self, request: &GraphqlRequest) -> Result<Value, TransportError>;
}

/// reqwest-backed transport.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use apa_gql::transport::HttpTransport;
///
/// let transport = HttpTransport::new("https://gql.poolplayers.com/graphql", Duration::from_secs(30))?;
/// # Ok::<(), apa_gql::transport::TransportError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(4)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl GraphqlTransport for HttpTransport {
    async fn post(&self, request: &GraphqlRequest) -> Result<Value, TransportError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = request.access_token.as_deref() {
            builder = builder.header(AUTHENTICATE_HEADER, token);
        }
        let resp = builder.json(&request.body()).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()));
        }
        // Some servers pair GraphQL errors (including TokenExpired) with a 4xx.
        match serde_json::from_str::<Value>(&text) {
            Ok(body) if body.get("errors").is_some_and(Value::is_array) => Ok(body),
            _ => Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            }),
        }
    }
}
