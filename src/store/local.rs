use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One fixed storage name per concern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Resume snapshot of the running game
    SavedGame,
    /// Finished games, newest first
    History,
    /// User profile and default preferences
    Profile,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::SavedGame => "social-chaos-saved-game",
            StorageKey::History => "social-chaos-history",
            StorageKey::Profile => "social-chaos-profile",
        }
    }
}

#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn save(&self, key: StorageKey, value: serde_json::Value) -> StoreResult<()>;

    async fn load(&self, key: StorageKey) -> StoreResult<Option<serde_json::Value>>;

    async fn delete(&self, key: StorageKey) -> StoreResult<()>;
}

/// Serialize and save a typed value
pub async fn save_json<T: Serialize>(
    store: &dyn LocalStore,
    key: StorageKey,
    value: &T,
) -> StoreResult<()> {
    store.save(key, serde_json::to_value(value)?).await
}

/// Load and deserialize a typed value
pub async fn load_json<T: DeserializeOwned>(
    store: &dyn LocalStore,
    key: StorageKey,
) -> StoreResult<Option<T>> {
    match store.load(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// One JSON file per key under a data directory
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    dir: PathBuf,
}

impl FileLocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: StorageKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

#[async_trait]
impl LocalStore for FileLocalStore {
    async fn save(&self, key: StorageKey, value: serde_json::Value) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let bytes = serde_json::to_vec_pretty(&value)?;

        // Write then rename so a crash never leaves a half-written file
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, key: StorageKey) -> StoreResult<Option<serde_json::Value>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn delete(&self, key: StorageKey) -> StoreResult<()> {
        match tokio::fs::remove_file(self.path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Volatile local store
#[derive(Debug, Clone, Default)]
pub struct MemoryLocalStore {
    values: Arc<RwLock<HashMap<StorageKey, serde_json::Value>>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn save(&self, key: StorageKey, value: serde_json::Value) -> StoreResult<()> {
        self.values.write().await.insert(key, value);
        Ok(())
    }

    async fn load(&self, key: StorageKey) -> StoreResult<Option<serde_json::Value>> {
        Ok(self.values.read().await.get(&key).cloned())
    }

    async fn delete(&self, key: StorageKey) -> StoreResult<()> {
        self.values.write().await.remove(&key);
        Ok(())
    }
}
