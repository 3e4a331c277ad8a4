//! apa-gql: session-managed GraphQL client for the APA league API.
//!
//! Handles the two-tier token lifecycle (refresh token from a login
//! handshake, short-lived access tokens per request), caches tokens in a
//! pluggable keyed store, and transparently re-authenticates once when the
//! server reports an expired access token.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use apa_gql::prelude::*;
//!
//! # async fn example() -> apa_gql::error::Result<()> {
//! let config = ApaConfig::from_env()?;
//! let store = Arc::new(FileKeyValueStore::new(config.store_dir.clone()));
//! let client = SessionClient::from_config(&config, store)?;
//! let creds = CredentialSet::from_env()?;
//! let response = client.query(&creds, "query { viewer { id } }", &Default::default()).await?;
//! println!("{response}");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod transport;

#[cfg(feature = "cli")]
pub mod cli;
