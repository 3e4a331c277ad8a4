mod support;

use std::sync::Arc;
use std::time::Duration;

use apa_gql::auth::{InMemoryKeyValueStore, TokenKind, TokenCache};
use apa_gql::client::{BatchPolicy, QueryItem, SessionClient};
use apa_gql::error::ApaError;
use pretty_assertions::assert_eq;
use serde_json::{json, Map};

use support::{
    access_token, authorized, credentials, login_denied, login_success, payload, ScriptedTransport,
};

fn client(transport: Arc<ScriptedTransport>, store: &InMemoryKeyValueStore) -> SessionClient {
    SessionClient::builder()
        .transport(transport)
        .store(Arc::new(store.clone()))
        .build()
}

#[tokio::test]
async fn query_logs_in_once_and_reuses_token_across_calls() {
    let transport = Arc::new(ScriptedTransport::new([
        login_success("device-1"),
        authorized("refresh-1"),
        access_token("access-1"),
        payload(json!({ "n": 1 })),
        payload(json!({ "n": 2 })),
    ]));
    let store = InMemoryKeyValueStore::new();
    let client = client(transport.clone(), &store);
    let creds = credentials();

    let first = client.query(&creds, "{ n }", &Map::new()).await.unwrap();
    let second = client.query(&creds, "{ n }", &Map::new()).await.unwrap();

    assert_eq!(first["data"]["n"], json!(1));
    assert_eq!(second["data"]["n"], json!(2));
    assert_eq!(
        transport.operations(),
        vec!["login", "authorize", "generateAccessToken", "query", "query"]
    );
    let requests = transport.requests();
    assert_eq!(requests[3].access_token.as_deref(), Some("access-1"));
    assert_eq!(requests[4].access_token.as_deref(), Some("access-1"));
}

#[tokio::test]
async fn tokens_persist_across_client_instances_sharing_a_store() {
    let store = InMemoryKeyValueStore::new();
    let first = Arc::new(ScriptedTransport::new([
        login_success("device-1"),
        authorized("refresh-1"),
        access_token("access-1"),
        payload(json!({})),
    ]));
    client(first, &store)
        .query(&credentials(), "{ a }", &Map::new())
        .await
        .unwrap();

    let second = Arc::new(ScriptedTransport::new([payload(json!({}))]));
    client(second.clone(), &store)
        .query(&credentials(), "{ a }", &Map::new())
        .await
        .unwrap();

    assert_eq!(second.operations(), vec!["query"]);
}

#[tokio::test]
async fn batch_with_continue_on_fail_records_errors_in_order() {
    let transport = Arc::new(ScriptedTransport::new([
        login_denied("bad password"),
        login_success("device-1"),
        authorized("refresh-1"),
        access_token("access-1"),
        payload(json!({ "ok": true })),
    ]));
    let store = InMemoryKeyValueStore::new();
    let client = client(transport, &store);
    let items = vec![QueryItem::new("{ first }"), QueryItem::new("{ second }")];

    let results = client
        .run_batch(&credentials(), &items, BatchPolicy { continue_on_fail: true })
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    let message = results[0]["error"].as_str().unwrap();
    assert!(message.contains("bad password"));
    assert_eq!(results[1], json!({ "data": { "ok": true } }));
}

#[tokio::test]
async fn batch_fail_fast_stops_at_first_error() {
    let transport = Arc::new(ScriptedTransport::new([
        login_denied("bad password"),
        login_success("device-1"),
    ]));
    let store = InMemoryKeyValueStore::new();
    let client = client(transport.clone(), &store);
    let items = vec![QueryItem::new("{ first }"), QueryItem::new("{ second }")];

    let err = client
        .run_batch(&credentials(), &items, BatchPolicy::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApaError::Authentication(_)));
    assert_eq!(transport.operations(), vec!["login"]);
    assert_eq!(transport.remaining(), 1);
}

#[tokio::test]
async fn batch_items_carry_their_own_variables() {
    let transport = Arc::new(ScriptedTransport::new([
        login_success("device-1"),
        authorized("refresh-1"),
        access_token("access-1"),
        payload(json!({})),
        payload(json!({})),
    ]));
    let store = InMemoryKeyValueStore::new();
    let client = client(transport.clone(), &store);
    let items = vec![
        QueryItem::new("{ a }").with_variables(apa_gql::client::variables_from_pairs([("id", "1")])),
        QueryItem::new("{ b }").with_variables(apa_gql::client::variables_from_pairs([("id", "2")])),
    ];

    client
        .run_batch(&credentials(), &items, BatchPolicy::default())
        .await
        .unwrap();

    let requests = transport.requests();
    assert_eq!(requests[3].variables["id"], json!("1"));
    assert_eq!(requests[4].variables["id"], json!("2"));
}

#[tokio::test]
async fn status_and_logout_reflect_cache() {
    let transport = Arc::new(ScriptedTransport::new([]));
    let store = InMemoryKeyValueStore::new();
    let client = client(transport, &store);
    let creds = credentials();
    let cache = TokenCache::new(Arc::new(store.clone()));
    cache
        .set(&creds.identity(), TokenKind::Refresh, "refresh-1")
        .await
        .unwrap();
    cache
        .set(&creds.identity(), TokenKind::Access, "access-1")
        .await
        .unwrap();

    let status = client.status(&creds).await;
    assert!(status.has_refresh_token);
    assert!(status.access_token_expires_at.is_some());

    client.logout(&creds).await.unwrap();

    let status = client.status(&creds).await;
    assert!(!status.has_refresh_token);
    assert!(status.access_token_expires_at.is_none());
    assert!(store.keys().is_empty());
}

#[tokio::test]
async fn builder_applies_custom_access_ttl() {
    let transport = Arc::new(ScriptedTransport::new([access_token("access-1")]));
    let store = InMemoryKeyValueStore::new();
    let client = SessionClient::builder()
        .transport(transport)
        .store(Arc::new(store.clone()))
        .access_token_ttl(Duration::ZERO)
        .build();
    let creds = credentials();
    TokenCache::new(Arc::new(store.clone()))
        .set(&creds.identity(), TokenKind::Refresh, "refresh-1")
        .await
        .unwrap();

    // The access token would be usable for zero seconds, so status never sees it.
    let _ = client.query(&creds, "{ a }", &Map::new()).await;
    assert!(client.status(&creds).await.access_token_expires_at.is_none());
}
