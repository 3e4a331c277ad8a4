//! Convenience re-exports for common use.

pub use crate::auth::{
    AuthError, CredentialSet, FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore,
};
pub use crate::client::{variables_from_pairs, BatchPolicy, QueryItem, SessionClient};
pub use crate::config::ApaConfig;
pub use crate::error::{ApaError, Result};
pub use crate::transport::{GraphqlTransport, HttpTransport};
