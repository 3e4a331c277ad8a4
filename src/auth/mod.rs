//! Credential identity, token caching, and the login handshake.

pub mod cache;
pub mod credentials;
pub mod error;
pub mod handshake;
pub mod resolver;
pub mod store;
pub mod token;

pub use cache::{token_key, TokenCache, DEFAULT_ACCESS_TOKEN_TTL};
pub use credentials::{identity_of, CredentialIdentity, CredentialSet};
pub use error::AuthError;
pub use handshake::AuthHandshake;
pub use resolver::AccessTokenResolver;
pub use store::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore};
pub use token::{TokenKind, TokenRecord};
