use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use super::error::AuthError;

const ENTRY_FILE_VERSION: u32 = 1;

/// Keyed storage shared by every execution in the process.
///
/// Backends may be local or remote; every call is a potential suspension point.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, AuthError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), AuthError>;
    /// Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), AuthError>;
}

/// Process-wide in-memory store. Clones share the same map.
///
/// # Example
/// ```no_run
/// use apa_gql::auth::{AuthError, InMemoryKeyValueStore, KeyValueStore};
///
/// # async fn example() -> Result<(), AuthError> {
/// let store = InMemoryKeyValueStore::new();
/// store.set("k", serde_json::json!({"token": "t"})).await?;
/// assert!(store.get("k").await?.is_some());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sorted list of keys currently held.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, AuthError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), AuthError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AuthError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Directory-backed store: one JSON file per key, written atomically.
///
/// # Example
/// ```no_run
/// use apa_gql::auth::FileKeyValueStore;
///
/// let store = FileKeyValueStore::new(std::path::PathBuf::from("/tmp/apa"));
/// ```
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    base_dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", file_stem(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, AuthError> {
        let path = self.entry_path(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(AuthError::Store(err.to_string())),
        };
        let entry: EntryFile = serde_json::from_str(&raw)?;
        if entry.version != ENTRY_FILE_VERSION {
            return Err(AuthError::Serialization(format!(
                "Unsupported entry version {} at {}",
                entry.version,
                path.display()
            )));
        }
        Ok(Some(entry.value))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), AuthError> {
        let entry = EntryFile {
            version: ENTRY_FILE_VERSION,
            key: key.to_string(),
            value,
            saved_at: Utc::now(),
        };
        let serialized = serde_json::to_vec_pretty(&entry)?;
        atomic_write(&self.entry_path(key), &serialized).await
    }

    async fn delete(&self, key: &str) -> Result<(), AuthError> {
        match tokio::fs::remove_file(self.entry_path(key)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AuthError::Store(err.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryFile {
    version: u32,
    key: String,
    value: Value,
    saved_at: DateTime<Utc>,
}

/// Keys keep their case; anything outside `[A-Za-z0-9_-]` becomes `-`.
fn file_stem(key: &str) -> String {
    let stem: String = key
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '-'
            }
        })
        .collect();
    if stem.is_empty() {
        "default".to_string()
    } else {
        stem
    }
}

async fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| AuthError::Store(format!("Entry path {} has no file name", path.display())))?;
    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let temp_path = path.with_file_name(format!(
        ".{}.tmp-{}-{nonce}",
        file_name.to_string_lossy(),
        std::process::id()
    ));

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    if let Err(err) = write_entry(&options, &temp_path, data).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(err.into());
    }
    if let Err(err) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(err.into());
    }
    Ok(())
}

async fn write_entry(
    options: &tokio::fs::OpenOptions,
    path: &Path,
    data: &[u8],
) -> std::io::Result<()> {
    let mut file = options.open(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}
