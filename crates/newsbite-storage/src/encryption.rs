//! Device encryption key
//!
//! One 256-bit key per installation. The persisted form is a hex string held
//! by the secure credential holder; older installations stored a short random
//! string instead, which is stretched with SHA-256.

use crate::{Error, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Key length in bytes
pub const KEY_LEN: usize = 32;

/// Encryption key for stored values
#[derive(Clone)]
pub struct EncryptionKey(Zeroizing<[u8; KEY_LEN]>);

impl EncryptionKey {
    /// Generate a fresh random key from the OS RNG
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut key[..]);
        Self(key)
    }

    /// Restore from a persisted secret string.
    ///
    /// A 64-character hex string is decoded directly. Anything else is
    /// treated as a legacy secret and hashed with SHA-256.
    pub fn from_secret(secret: &str) -> Self {
        if secret.len() == KEY_LEN * 2 {
            if let Ok(bytes) = hex::decode(secret) {
                if let Ok(key) = Self::from_bytes_slice(&bytes) {
                    return key;
                }
            }
        }
        Self::from_legacy_secret(secret)
    }

    /// Derive using SHA-256 (legacy secrets and the fixed fallback)
    pub fn from_legacy_secret(secret: &str) -> Self {
        let hash = Sha256::digest(secret.as_bytes());
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(&hash);
        Self(key)
    }

    /// Create from raw key bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Create from raw key bytes slice
    pub fn from_bytes_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LEN {
            return Err(Error::Encryption("Invalid key length".to_string()));
        }
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }

    /// Hex form persisted in the secure credential holder
    pub fn to_secret(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.0[..]))
    }

    /// Get key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_differ() {
        let a = EncryptionKey::generate();
        let b = EncryptionKey::generate();
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_secret_roundtrip() {
        let key = EncryptionKey::generate();
        let secret = key.to_secret();
        assert_eq!(secret.len(), 64);

        let restored = EncryptionKey::from_secret(&secret);
        assert_eq!(restored.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_legacy_secret_is_stretched() {
        // Older installations persisted a 26-char base36 string
        let legacy = "k3j5h2g8f9d0s7a6l1p4o3i2u1";
        let a = EncryptionKey::from_secret(legacy);
        let b = EncryptionKey::from_secret(legacy);
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_eq!(a.as_bytes(), EncryptionKey::from_legacy_secret(legacy).as_bytes());
    }

    #[test]
    fn test_non_hex_of_hex_length_falls_back() {
        let odd = "z".repeat(64);
        let key = EncryptionKey::from_secret(&odd);
        assert_eq!(key.as_bytes(), EncryptionKey::from_legacy_secret(&odd).as_bytes());
    }

    #[test]
    fn test_invalid_slice_length() {
        assert!(EncryptionKey::from_bytes_slice(&[0u8; 16]).is_err());
        assert!(EncryptionKey::from_bytes_slice(&[0u8; 32]).is_ok());
    }

    #[test]
    fn test_debug_hides_material() {
        let key = EncryptionKey::from_bytes([7u8; 32]);
        assert_eq!(format!("{:?}", key), "EncryptionKey(..)");
    }
}
