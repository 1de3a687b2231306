//! Secure credential holder integration
//!
//! The device key lives outside the key-value store, in platform storage for
//! secrets:
//! - iOS/macOS: Keychain
//! - Android: Keystore-backed encrypted preferences
//! - Web: none (see [`KeyPolicy::InsecureFixed`])
//!
//! Hosts bridge their platform API by implementing [`SecureCredentialHolder`].

use crate::config::{KeyPolicy, StoreConfig};
use crate::encryption::EncryptionKey;
use crate::{Error, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use zeroize::Zeroizing;

/// Platform storage for secrets. Only ever used for the device key.
#[async_trait]
pub trait SecureCredentialHolder: Send + Sync {
    /// Read the secret stored under `alias`
    async fn get(&self, alias: &str) -> Result<Option<String>>;

    /// Store `value` under `alias`, replacing any previous value
    async fn set(&self, alias: &str, value: &str) -> Result<()>;
}

/// In-process credential holder for tests and hosts that inject secrets
#[derive(Default)]
pub struct MemoryCredentialHolder {
    entries: RwLock<HashMap<String, Zeroizing<String>>>,
}

impl MemoryCredentialHolder {
    /// Create empty holder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a pre-existing secret
    pub fn with_secret(alias: &str, secret: &str) -> Self {
        let holder = Self::new();
        holder
            .entries
            .write()
            .insert(alias.to_string(), Zeroizing::new(secret.to_string()));
        holder
    }

    /// Number of stored secrets
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no secret is stored
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every secret, as an OS wipe on uninstall would
    pub fn wipe(&self) {
        self.entries.write().clear();
    }
}

#[async_trait]
impl SecureCredentialHolder for MemoryCredentialHolder {
    async fn get(&self, alias: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(alias).map(|s| s.to_string()))
    }

    async fn set(&self, alias: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .insert(alias.to_string(), Zeroizing::new(value.to_string()));
        Ok(())
    }
}

enum KeySource {
    Holder {
        holder: Arc<dyn SecureCredentialHolder>,
        alias: String,
    },
    Fixed {
        secret: Zeroizing<String>,
    },
}

/// Resolves the device encryption key.
///
/// The key is materialised once per manager; concurrent first uses wait on
/// the same initialisation so only one key is ever generated.
pub struct KeyManager {
    source: KeySource,
    key: OnceCell<EncryptionKey>,
}

impl KeyManager {
    /// Key kept in `holder` under `alias`, created on first use
    pub fn with_holder(holder: Arc<dyn SecureCredentialHolder>, alias: impl Into<String>) -> Self {
        Self {
            source: KeySource::Holder {
                holder,
                alias: alias.into(),
            },
            key: OnceCell::new(),
        }
    }

    /// Key derived from a fixed secret. Provides no confidentiality.
    pub fn insecure_fixed(secret: impl Into<String>) -> Self {
        Self {
            source: KeySource::Fixed {
                secret: Zeroizing::new(secret.into()),
            },
            key: OnceCell::new(),
        }
    }

    /// Build from configuration. [`KeyPolicy::SecureHolder`] requires a holder.
    pub fn from_config(
        config: &StoreConfig,
        holder: Option<Arc<dyn SecureCredentialHolder>>,
    ) -> Result<Self> {
        match (&config.key_policy, holder) {
            (KeyPolicy::SecureHolder, Some(holder)) => {
                Ok(Self::with_holder(holder, config.key_alias.clone()))
            }
            (KeyPolicy::SecureHolder, None) => Err(Error::Keystore(
                "secure_holder key policy requires a secure credential holder".to_string(),
            )),
            (KeyPolicy::InsecureFixed { secret }, _) => Ok(Self::insecure_fixed(secret.clone())),
        }
    }

    /// Whether keys from this manager give confidentiality at rest
    pub fn is_confidential(&self) -> bool {
        matches!(self.source, KeySource::Holder { .. })
    }

    /// Get the device key, creating and persisting it on first use
    pub async fn encryption_key(&self) -> Result<&EncryptionKey> {
        self.key.get_or_try_init(|| self.load_or_create()).await
    }

    async fn load_or_create(&self) -> Result<EncryptionKey> {
        match &self.source {
            KeySource::Fixed { secret } => {
                tracing::warn!(
                    "Storage key is derived from a fixed secret; stored values are not confidential"
                );
                Ok(EncryptionKey::from_legacy_secret(secret))
            }
            KeySource::Holder { holder, alias } => {
                // An empty entry counts as absent
                if let Some(secret) = holder.get(alias).await?.filter(|s| !s.is_empty()) {
                    tracing::debug!("Loaded storage key from secure credential holder");
                    return Ok(EncryptionKey::from_secret(&secret));
                }

                let key = EncryptionKey::generate();
                holder.set(alias, &key.to_secret()).await?;
                tracing::info!("Generated new storage key");
                Ok(key)
            }
        }
    }
}
