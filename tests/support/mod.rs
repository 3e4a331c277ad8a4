#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use apa_gql::auth::{
    AccessTokenResolver, AuthHandshake, CredentialIdentity, CredentialSet, InMemoryKeyValueStore,
    TokenCache,
};
use apa_gql::transport::{GraphqlRequest, GraphqlTransport, TransportError};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Transport that replays a fixed script of responses and records requests.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Value, TransportError>>>,
    requests: Mutex<Vec<GraphqlRequest>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new(responses: impl IntoIterator<Item = Value>) -> Self {
        let transport = Self::default();
        for response in responses {
            transport.push(Ok(response));
        }
        transport
    }

    /// Sleep before answering, so concurrent callers interleave.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, response: Result<Value, TransportError>) {
        self.script
            .lock()
            .expect("script lock poisoned")
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<GraphqlRequest> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }

    /// Operation name per request: `login`, `authorize`,
    /// `generateAccessToken`, or `query` for caller documents.
    pub fn operations(&self) -> Vec<&'static str> {
        self.requests()
            .iter()
            .map(|request| operation(&request.query))
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script lock poisoned").len()
    }
}

fn operation(query: &str) -> &'static str {
    if query.contains("mutation login") {
        "login"
    } else if query.contains("mutation authorize") {
        "authorize"
    } else if query.contains("GenerateAccessTokenMutation") {
        "generateAccessToken"
    } else {
        "query"
    }
}

#[async_trait]
impl GraphqlTransport for ScriptedTransport {
    async fn post(&self, request: &GraphqlRequest) -> Result<Value, TransportError> {
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .expect("script lock poisoned")
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::Decode(format!(
                    "unscripted request: {}",
                    operation(&request.query)
                )))
            })
    }
}

pub struct Harness {
    pub transport: Arc<ScriptedTransport>,
    pub store: InMemoryKeyValueStore,
    pub cache: TokenCache,
    pub resolver: Arc<AccessTokenResolver>,
    pub credentials: CredentialSet,
    pub identity: CredentialIdentity,
}

pub fn harness(responses: impl IntoIterator<Item = Value>) -> Harness {
    harness_with(ScriptedTransport::new(responses))
}

pub fn harness_with(transport: ScriptedTransport) -> Harness {
    let transport = Arc::new(transport);
    let store = InMemoryKeyValueStore::new();
    let cache = TokenCache::new(Arc::new(store.clone()));
    let handshake = AuthHandshake::new(transport.clone(), cache.clone());
    let resolver = Arc::new(AccessTokenResolver::new(handshake, cache.clone()));
    let credentials = credentials();
    let identity = credentials.identity();
    Harness {
        transport,
        store,
        cache,
        resolver,
        credentials,
        identity,
    }
}

pub fn credentials() -> CredentialSet {
    CredentialSet::new("captain@example.com", "rack-em-up")
}

pub fn login_success(device_token: &str) -> Value {
    json!({ "data": { "login": {
        "__typename": "SuccessLoginPayload",
        "deviceRefreshToken": device_token
    }}})
}

pub fn login_denied(reason: &str) -> Value {
    json!({ "data": { "login": {
        "__typename": "DeniedLoginPayload",
        "reason": reason
    }}})
}

pub fn authorized(refresh_token: &str) -> Value {
    json!({ "data": { "authorize": {
        "__typename": "AuthorizePayload",
        "refreshToken": refresh_token
    }}})
}

pub fn access_token(token: &str) -> Value {
    json!({ "data": { "generateAccessToken": {
        "__typename": "AccessTokenPayload",
        "accessToken": token
    }}})
}

pub fn access_token_missing() -> Value {
    json!({ "data": { "generateAccessToken": null } })
}

pub fn token_expired() -> Value {
    json!({ "errors": [{
        "message": "Access token expired",
        "extensions": { "name": "TokenExpired" }
    }]})
}

pub fn payload(data: Value) -> Value {
    json!({ "data": data })
}
