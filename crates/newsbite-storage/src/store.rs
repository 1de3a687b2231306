//! Encrypted key-value store
//!
//! Values are serialized to JSON, sealed with the device key, base64-encoded
//! and handed to a [`KeyValueBackend`]. Reads run a two-step decode: the
//! sealed format first, then plain JSON written by the unencrypted
//! predecessor of this store. A value that passes neither is absent.

use crate::backend::KeyValueBackend;
use crate::config::StoreConfig;
use crate::keystore::{KeyManager, SecureCredentialHolder};
use crate::security::{self, EncryptionAlgorithm};
use crate::{EncryptionKey, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// How a stored value was decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    /// Sealed with the device key
    Encrypted,
    /// Plain JSON from before encryption was introduced
    LegacyPlaintext,
}

/// Durable, confidential storage of small structured values
pub struct EncryptedStore {
    backend: Arc<dyn KeyValueBackend>,
    keys: KeyManager,
    algorithm: EncryptionAlgorithm,
    reseal_legacy: bool,
}

impl EncryptedStore {
    /// Create store over `backend` using `keys` for the device key
    pub fn new(backend: Arc<dyn KeyValueBackend>, keys: KeyManager) -> Self {
        Self {
            backend,
            keys,
            algorithm: EncryptionAlgorithm::default(),
            reseal_legacy: false,
        }
    }

    /// Create store from configuration
    pub fn from_config(
        backend: Arc<dyn KeyValueBackend>,
        holder: Option<Arc<dyn SecureCredentialHolder>>,
        config: &StoreConfig,
    ) -> Result<Self> {
        config.validate()?;
        let keys = KeyManager::from_config(config, holder)?;
        Ok(Self {
            backend,
            keys,
            algorithm: config.algorithm,
            reseal_legacy: config.reseal_legacy_values,
        })
    }

    /// Override the cipher used for new writes
    pub fn with_algorithm(mut self, algorithm: EncryptionAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Re-write legacy plaintext values in sealed form when they are read
    pub fn with_legacy_resealing(mut self, enabled: bool) -> Self {
        self.reseal_legacy = enabled;
        self
    }

    /// Key manager backing this store
    pub fn key_manager(&self) -> &KeyManager {
        &self.keys
    }

    /// Serialize, seal and persist `value` under `key`
    pub async fn set_item<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_vec(value)?;
        self.write_sealed(key, &json).await.map_err(|e| {
            tracing::error!("Failed to store '{}': {}", key, e);
            e
        })
    }

    /// Read and decode the value under `key`.
    ///
    /// Returns `None` when the key is absent, when neither the sealed nor the
    /// legacy format decodes into `T`, and when the backend or key cannot be
    /// read (logged).
    pub async fn get_item<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.read_item(key).await {
            Ok(Some((value, _))) => Some(value),
            Ok(None) => None,
            Err(e) => {
                tracing::error!("Failed to read '{}': {}", key, e);
                None
            }
        }
    }

    /// Like [`get_item`](Self::get_item) but reports which format matched
    pub async fn get_item_with_format<T: DeserializeOwned>(&self, key: &str) -> Option<(T, ValueFormat)> {
        self.read_item(key).await.unwrap_or_else(|e| {
            tracing::error!("Failed to read '{}': {}", key, e);
            None
        })
    }

    /// Delete `key`. Removing an absent key succeeds.
    pub async fn remove_item(&self, key: &str) -> Result<()> {
        self.backend.remove(key).await
    }

    /// Delete every key owned by this store (account/data reset)
    pub async fn clear(&self) -> Result<()> {
        tracing::info!("Clearing encrypted store");
        self.backend.clear().await
    }

    async fn write_sealed(&self, key: &str, plaintext: &[u8]) -> Result<()> {
        let device_key = self.keys.encryption_key().await?;
        let sealed = security::seal(device_key, self.algorithm, plaintext)?;
        let encoded = BASE64.encode(sealed);
        self.backend.set(key, encoded.as_bytes()).await
    }

    async fn read_item<T: DeserializeOwned>(&self, key: &str) -> Result<Option<(T, ValueFormat)>> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }

        match self.keys.encryption_key().await {
            Ok(device_key) => {
                if let Some(value) = decode_sealed(device_key, &raw) {
                    return Ok(Some((value, ValueFormat::Encrypted)));
                }
            }
            Err(e) => tracing::warn!("Storage key unavailable while reading '{}': {}", key, e),
        }

        match serde_json::from_slice::<T>(&raw) {
            Ok(value) => {
                tracing::debug!("Read legacy plaintext value for '{}'", key);
                if self.reseal_legacy {
                    self.reseal(key, &raw).await;
                }
                Ok(Some((value, ValueFormat::LegacyPlaintext)))
            }
            Err(_) => {
                tracing::warn!("Value for '{}' is unreadable; treating as absent", key);
                Ok(None)
            }
        }
    }

    async fn reseal(&self, key: &str, legacy_json: &[u8]) {
        match self.write_sealed(key, legacy_json).await {
            Ok(()) => tracing::info!("Re-sealed legacy value for '{}'", key),
            Err(e) => tracing::warn!("Could not re-seal legacy value for '{}': {}", key, e),
        }
    }
}

fn decode_sealed<T: DeserializeOwned>(key: &EncryptionKey, raw: &[u8]) -> Option<T> {
    let text = std::str::from_utf8(raw).ok()?;
    let sealed = BASE64.decode(text.trim()).ok()?;
    let plaintext = security::open(key, &sealed).ok()?;
    serde_json::from_slice(&plaintext).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::keystore::MemoryCredentialHolder;

    fn store() -> (EncryptedStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let holder = Arc::new(MemoryCredentialHolder::new());
        let store = EncryptedStore::new(backend.clone(), KeyManager::with_holder(holder, "k"));
        (store, backend)
    }

    #[tokio::test]
    async fn test_set_get_bool() {
        let (store, backend) = store();
        store.set_item("app_lock_enabled", &true).await.unwrap();

        assert_eq!(store.get_item::<bool>("app_lock_enabled").await, Some(true));
        let raw = backend.raw("app_lock_enabled").unwrap();
        assert_ne!(raw, b"true");
    }

    #[tokio::test]
    async fn test_format_reporting() {
        let (store, backend) = store();
        store.set_item("a", "sealed").await.unwrap();
        backend.insert_raw("b", "\"plain\"");

        assert_eq!(
            store.get_item_with_format::<String>("a").await,
            Some(("sealed".to_string(), ValueFormat::Encrypted))
        );
        assert_eq!(
            store.get_item_with_format::<String>("b").await,
            Some(("plain".to_string(), ValueFormat::LegacyPlaintext))
        );
    }

    #[tokio::test]
    async fn test_empty_raw_value_is_absent() {
        let (store, backend) = store();
        backend.insert_raw("empty", Vec::new());
        assert_eq!(store.get_item::<String>("empty").await, None);
    }

    #[tokio::test]
    async fn test_type_mismatch_is_absent() {
        let (store, _) = store();
        store.set_item("n", &42u32).await.unwrap();
        assert_eq!(store.get_item::<String>("n").await, None);
        assert_eq!(store.get_item::<u32>("n").await, Some(42));
    }
}
