//! Store configuration
//!
//! Serializable so hosts can ship it alongside their other settings.

use crate::security::EncryptionAlgorithm;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Alias under which the device key is kept in the secure credential holder
pub const DEFAULT_KEY_ALIAS: &str = "secure_storage_key";

/// Fixed secret used by hosts without a secure credential holder (web).
///
/// Anyone can derive the key from this constant, so values stored under
/// [`KeyPolicy::InsecureFixed`] are obfuscated, not confidential.
pub const INSECURE_FALLBACK_SECRET: &str = "web_fallback_key_do_not_use_for_sensitive_production_data";

/// Where the device encryption key comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyPolicy {
    /// Random key created on first use and kept in the secure credential holder
    SecureHolder,
    /// Fixed secret, no confidentiality. Must be chosen explicitly.
    InsecureFixed {
        /// Secret the key is derived from
        secret: String,
    },
}

impl KeyPolicy {
    /// Fixed-secret policy with the stock web fallback constant
    pub fn insecure_fallback() -> Self {
        Self::InsecureFixed {
            secret: INSECURE_FALLBACK_SECRET.to_string(),
        }
    }

    /// Whether values stored under this policy are confidential
    pub fn is_confidential(&self) -> bool {
        matches!(self, Self::SecureHolder)
    }
}

impl Default for KeyPolicy {
    fn default() -> Self {
        Self::SecureHolder
    }
}

/// Encrypted store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Credential holder alias for the device key
    pub key_alias: String,
    /// Cipher used for new writes
    pub algorithm: EncryptionAlgorithm,
    /// Key source
    pub key_policy: KeyPolicy,
    /// Re-write values read through the legacy plaintext path in encrypted form
    pub reseal_legacy_values: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            key_alias: DEFAULT_KEY_ALIAS.to_string(),
            algorithm: EncryptionAlgorithm::default(),
            key_policy: KeyPolicy::default(),
            reseal_legacy_values: false,
        }
    }
}

impl StoreConfig {
    /// Parse from JSON, filling missing fields with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants not expressible in the type
    pub fn validate(&self) -> Result<()> {
        if self.key_alias.trim().is_empty() {
            return Err(Error::Config("key_alias must not be empty".to_string()));
        }
        if let KeyPolicy::InsecureFixed { secret } = &self.key_policy {
            if secret.is_empty() {
                return Err(Error::Config("fixed key secret must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.key_alias, "secure_storage_key");
        assert_eq!(config.algorithm, EncryptionAlgorithm::ChaCha20Poly1305);
        assert_eq!(config.key_policy, KeyPolicy::SecureHolder);
        assert!(!config.reseal_legacy_values);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = StoreConfig::from_json(r#"{"reseal_legacy_values": true}"#).unwrap();
        assert!(config.reseal_legacy_values);
        assert_eq!(config.key_alias, DEFAULT_KEY_ALIAS);
    }

    #[test]
    fn test_fixed_policy_json() {
        let config = StoreConfig::from_json(
            r#"{"algorithm": "aes-256-gcm", "key_policy": {"kind": "insecure_fixed", "secret": "dev"}}"#,
        )
        .unwrap();
        assert_eq!(config.algorithm, EncryptionAlgorithm::AesGcm);
        assert!(!config.key_policy.is_confidential());
    }

    #[test]
    fn test_validation() {
        assert!(StoreConfig::from_json(r#"{"key_alias": "  "}"#).is_err());
        assert!(StoreConfig::from_json(
            r#"{"key_policy": {"kind": "insecure_fixed", "secret": ""}}"#
        )
        .is_err());
        assert!(StoreConfig::from_json("not json").is_err());
    }
}
