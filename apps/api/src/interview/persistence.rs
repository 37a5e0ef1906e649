//! Persistence of the session state as one versioned JSON blob.
//!
//! The core never waits on storage for correctness: `SessionManager` saves
//! after each mutation and logs failures. Adapters only move bytes.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::interview::session::SessionState;

/// Bump when the blob layout changes and add a step to `migrate`.
pub const SCHEMA_VERSION: u64 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("persisted state has no schema version")]
    MissingVersion,

    #[error("persisted state has unsupported schema version {0}")]
    UnsupportedVersion(u64),

    #[error("background write failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    pub version: u64,
    pub state: SessionState,
}

impl PersistedState {
    pub fn current(state: SessionState) -> Self {
        Self {
            version: SCHEMA_VERSION,
            state,
        }
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a blob of any known version and upgrades it to the current layout.
    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        let value: Value = serde_json::from_str(raw)?;
        Ok(Self::current(migrate(value)?))
    }
}

/// Upgrades a raw blob to the current `SessionState`.
///
/// Fields added to `Candidate` after version 1 carry `#[serde(default)]`, so
/// version 1 blobs deserialize directly.
pub fn migrate(mut value: Value) -> Result<SessionState, StoreError> {
    let version = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or(StoreError::MissingVersion)?;

    match version {
        1 => {
            let state = value
                .get_mut("state")
                .map(Value::take)
                .unwrap_or(Value::Null);
            Ok(serde_json::from_value(state)?)
        }
        other => Err(StoreError::UnsupportedVersion(other)),
    }
}

#[async_trait]
pub trait StateStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<PersistedState>, StoreError>;

    async fn save(&self, state: &PersistedState) -> Result<(), StoreError>;

    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// File backend
// ────────────────────────────────────────────────────────────────────────────

/// Stores the blob in a single JSON file, replaced atomically on every save.
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(Some(PersistedState::from_json(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No state file at {}, starting empty", self.path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        let json = state.to_json()?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, json.as_bytes())).await??;
        debug!("Saved session state to {}", self.path.display());
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

/// Writes to a temp file beside `path`, then renames it over `path`.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Redis backend
// ────────────────────────────────────────────────────────────────────────────

/// Stores the blob under a single Redis key.
pub struct RedisStateStore {
    client: redis::Client,
    key: String,
}

impl RedisStateStore {
    pub fn new(client: redis::Client, key: impl Into<String>) -> Self {
        Self {
            client,
            key: key.into(),
        }
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(&self.key).await?;
        raw.map(|r| PersistedState::from_json(&r)).transpose()
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        let json = state.to_json()?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(&self.key, json).await?;
        debug!("Saved session state to redis key {}", self.key);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory backend
// ────────────────────────────────────────────────────────────────────────────

/// Keeps the serialized blob in memory. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStateStore {
    blob: Mutex<Option<String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        let blob = self.blob.lock().await;
        blob.as_deref().map(PersistedState::from_json).transpose()
    }

    async fn save(&self, state: &PersistedState) -> Result<(), StoreError> {
        *self.blob.lock().await = Some(state.to_json()?);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
