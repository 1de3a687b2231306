//! Unencrypted persistence layer the store encrypts on top of

use crate::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Plain key-value persistence (AsyncStorage, SharedPreferences, a SQLite table).
///
/// Implementations are expected to serialize their own writes.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Read the bytes under `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write `value` under `key`. Rejections must surface as `Error::StorageWrite`.
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Delete `key`. Deleting an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Delete every key owned by this backend
    async fn clear(&self) -> Result<()>;
}

/// In-memory backend
#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    /// Create empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes under `key`, bypassing the store
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }

    /// Write raw bytes, bypassing the store (seeding legacy data)
    pub fn insert_raw(&self, key: &str, value: impl Into<Vec<u8>>) {
        self.entries.write().insert(key.to_string(), value.into());
    }

    /// Snapshot of every stored entry
    pub fn raw_entries(&self) -> Vec<(String, Vec<u8>)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the backend holds no keys
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().clear();
        Ok(())
    }
}
