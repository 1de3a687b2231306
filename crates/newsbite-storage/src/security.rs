//! Authenticated encryption for stored values
//!
//! Seals values with ChaCha20-Poly1305 or AES-256-GCM into a small versioned
//! envelope. The algorithm is recorded in the envelope so that a reader does
//! not need to know which algorithm the writer was configured with.

use crate::encryption::EncryptionKey;
use crate::{Error, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use chacha20poly1305::ChaCha20Poly1305;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Current envelope version
pub const ENVELOPE_VERSION: u8 = 1;

/// Nonce length for both supported ciphers
pub const NONCE_LEN: usize = 12;

/// Header length: version + algorithm + nonce
pub const HEADER_LEN: usize = 2 + NONCE_LEN;

/// Encryption algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    /// AES-256-GCM
    #[serde(rename = "aes-256-gcm")]
    AesGcm,
    /// ChaCha20-Poly1305
    #[serde(rename = "chacha20-poly1305")]
    ChaCha20Poly1305,
}

impl EncryptionAlgorithm {
    /// Envelope identifier byte
    pub fn id(self) -> u8 {
        match self {
            Self::AesGcm => 0,
            Self::ChaCha20Poly1305 => 1,
        }
    }

    /// Parse envelope identifier byte
    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(Self::AesGcm),
            1 => Ok(Self::ChaCha20Poly1305),
            other => Err(Error::Encryption(format!("Unknown algorithm: {}", other))),
        }
    }
}

impl Default for EncryptionAlgorithm {
    fn default() -> Self {
        Self::ChaCha20Poly1305
    }
}

/// Seal plaintext with `key`.
///
/// Format: `[version(1)][algorithm(1)][nonce(12)][ciphertext+tag]`
pub fn seal(key: &EncryptionKey, algorithm: EncryptionAlgorithm, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let ciphertext = match algorithm {
        EncryptionAlgorithm::AesGcm => {
            let cipher = Aes256Gcm::new(key.as_bytes().into());
            cipher.encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        }
        EncryptionAlgorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
            cipher.encrypt(chacha20poly1305::Nonce::from_slice(&nonce_bytes), plaintext)
        }
    }
    .map_err(|e| Error::Encryption(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + ciphertext.len());
    result.push(ENVELOPE_VERSION);
    result.push(algorithm.id());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Open an envelope produced by [`seal`].
///
/// Fails on unknown versions, unknown algorithms, truncated input, and any
/// authentication failure (wrong key or tampered ciphertext).
pub fn open(key: &EncryptionKey, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < HEADER_LEN {
        return Err(Error::Encryption("Invalid ciphertext length".to_string()));
    }

    let version = data[0];
    if version != ENVELOPE_VERSION {
        return Err(Error::Encryption(format!(
            "Unsupported encryption version: {}",
            version
        )));
    }

    let algorithm = EncryptionAlgorithm::from_id(data[1])?;
    let nonce = &data[2..HEADER_LEN];
    let ciphertext = &data[HEADER_LEN..];

    match algorithm {
        EncryptionAlgorithm::AesGcm => {
            let cipher = Aes256Gcm::new(key.as_bytes().into());
            cipher.decrypt(Nonce::from_slice(nonce), ciphertext)
        }
        EncryptionAlgorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
            cipher.decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext)
        }
    }
    .map_err(|e| Error::Encryption(e.to_string()))
}
