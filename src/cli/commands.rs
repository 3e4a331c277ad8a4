//! CLI command handlers for query, status, and logout.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::auth::{CredentialSet, FileKeyValueStore};
use crate::client::{variables_from_pairs, BatchPolicy, QueryItem, SessionClient};
use crate::config::ApaConfig;

use super::QueryArgs;

fn session() -> Result<(SessionClient, CredentialSet), Box<dyn std::error::Error>> {
    let config = ApaConfig::from_env()?;
    let store = Arc::new(FileKeyValueStore::new(config.store_dir.clone()));
    let client = SessionClient::from_config(&config, store)?;
    let credentials = CredentialSet::from_env()?;
    Ok((client, credentials))
}

/// Handle `apa-gql query ...`.
pub async fn handle_query(args: QueryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let variables = merged_variables(&args)?;
    let items: Vec<QueryItem> = args
        .queries
        .iter()
        .map(|query| QueryItem::new(query.clone()).with_variables(variables.clone()))
        .collect();

    let (client, credentials) = session()?;
    let policy = BatchPolicy {
        continue_on_fail: args.continue_on_fail,
    };
    let results = client.run_batch(&credentials, &items, policy).await?;

    let output = match <[Value; 1]>::try_from(results) {
        Ok([single]) => single,
        Err(many) => Value::Array(many),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Handle `apa-gql status`.
pub async fn handle_status() -> Result<(), Box<dyn std::error::Error>> {
    let (client, credentials) = session()?;
    let status = client.status(&credentials).await;
    println!("Account: {}", credentials.email);
    println!(
        "Refresh token: {}",
        if status.has_refresh_token { "cached" } else { "none" }
    );
    match status.access_token_expires_at {
        Some(expires_at) => println!("Access token: valid until {}", expires_at.to_rfc3339()),
        None => println!("Access token: none"),
    }
    Ok(())
}

/// Handle `apa-gql logout`.
pub async fn handle_logout() -> Result<(), Box<dyn std::error::Error>> {
    let (client, credentials) = session()?;
    client.logout(&credentials).await?;
    println!("Cleared cached tokens for {}", credentials.email);
    Ok(())
}

fn merged_variables(args: &QueryArgs) -> Result<Map<String, Value>, Box<dyn std::error::Error>> {
    let mut variables = variables_from_pairs(args.vars.iter().cloned());
    if let Some(raw) = &args.vars_json {
        match serde_json::from_str::<Value>(raw)? {
            Value::Object(extra) => variables.extend(extra),
            _ => return Err("--vars-json must be a JSON object".into()),
        }
    }
    Ok(variables)
}
