//! Encrypted key-value storage for Newsbite
//!
//! Persists small structured values under string keys, sealing each value
//! with a per-installation device key.
//!
//! ## Layers
//!
//! - **Store**: JSON serialization, sealing, two-step (sealed, then legacy
//!   plaintext) decoding
//! - **Key management**: device key created lazily and kept in the platform
//!   secure credential holder (Keychain, Android Keystore)
//! - **Cipher**: ChaCha20-Poly1305 (default) or AES-256-GCM in a versioned
//!   envelope
//! - **Persistence**: any [`KeyValueBackend`]; in-memory and SQLite ship here
//!
//! Hosts without a secure credential holder can opt into
//! [`KeyPolicy::InsecureFixed`], which keeps the storage format but gives up
//! confidentiality.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod config;
pub mod database;
pub mod encryption;
pub mod error;
pub mod keystore;
pub mod security;
pub mod store;

pub use backend::{KeyValueBackend, MemoryBackend};
pub use config::{KeyPolicy, StoreConfig, DEFAULT_KEY_ALIAS, INSECURE_FALLBACK_SECRET};
pub use database::SqliteBackend;
pub use encryption::EncryptionKey;
pub use error::{Error, Result};
pub use keystore::{KeyManager, MemoryCredentialHolder, SecureCredentialHolder};
pub use security::EncryptionAlgorithm;
pub use store::{EncryptedStore, ValueFormat};
