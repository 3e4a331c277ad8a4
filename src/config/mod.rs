//! Configuration (layered: code > env > defaults).

use std::path::PathBuf;
use std::time::Duration;

use crate::auth::DEFAULT_ACCESS_TOKEN_TTL;
use crate::error::ApaError;

pub const DEFAULT_ENDPOINT: &str = "https://gql.poolplayers.com/graphql";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime settings for a session client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApaConfig {
    /// GraphQL endpoint every request is posted to.
    pub endpoint: String,
    /// Client-side lifetime stamped on cached access tokens.
    pub access_token_ttl: Duration,
    pub request_timeout: Duration,
    /// Directory for the file-backed token store.
    pub store_dir: PathBuf,
}

impl Default for ApaConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            store_dir: default_store_dir(),
        }
    }
}

impl ApaConfig {
    /// Load from environment variables, reading `.env` first if present.
    ///
    /// Recognized: `APA_GRAPHQL_URL`, `APA_ACCESS_TOKEN_TTL_SECS`,
    /// `APA_REQUEST_TIMEOUT_SECS`, `APA_STORE_DIR`.
    pub fn from_env() -> Result<Self, ApaError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApaError> {
        let mut config = Self::default();
        if let Some(url) = lookup("APA_GRAPHQL_URL") {
            config.endpoint = url;
        }
        if let Some(raw) = lookup("APA_ACCESS_TOKEN_TTL_SECS") {
            config.access_token_ttl = parse_secs("APA_ACCESS_TOKEN_TTL_SECS", &raw)?;
        }
        if let Some(raw) = lookup("APA_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("APA_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(dir) = lookup("APA_STORE_DIR") {
            config.store_dir = PathBuf::from(dir);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn validate(&self) -> Result<(), ApaError> {
        let endpoint = self.endpoint.trim();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ApaError::Configuration(format!(
                "GraphQL endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ApaError::Configuration(
                "request timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_secs(name: &str, raw: &str) -> Result<Duration, ApaError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ApaError::Configuration(format!("{name} must be a whole number of seconds, got {raw:?}")))
}

fn default_store_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".apa"))
        .unwrap_or_else(|| PathBuf::from(".apa"))
}
