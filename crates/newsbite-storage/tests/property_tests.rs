//! Property-based tests for newsbite-storage
//!
//! Uses proptest to verify store invariants across randomized inputs

use newsbite_storage::security::{open, seal};
use newsbite_storage::{
    EncryptedStore, EncryptionAlgorithm, EncryptionKey, KeyManager, MemoryBackend,
    MemoryCredentialHolder,
};
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Storage keys as used by the app (alphanumeric with underscores)
fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,31}").unwrap()
}

/// Marker text long enough that it cannot appear in base64 by accident
fn marker_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z]{12,40}").unwrap()
}

fn algorithm_strategy() -> impl Strategy<Value = EncryptionAlgorithm> {
    prop_oneof![
        Just(EncryptionAlgorithm::ChaCha20Poly1305),
        Just(EncryptionAlgorithm::AesGcm),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

// ============================================================================
// Envelope Properties
// ============================================================================

proptest! {
    /// Property: open(seal(x)) == x under the same key
    #[test]
    fn prop_seal_open_roundtrip(
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
        algorithm in algorithm_strategy(),
    ) {
        let key = EncryptionKey::generate();
        let sealed = seal(&key, algorithm, &plaintext).expect("seal");
        prop_assert_eq!(open(&key, &sealed).expect("open"), plaintext);
    }

    /// Property: a different key never opens the envelope
    #[test]
    fn prop_foreign_key_rejected(
        plaintext in prop::collection::vec(any::<u8>(), 1..256),
        algorithm in algorithm_strategy(),
    ) {
        let sealed = seal(&EncryptionKey::generate(), algorithm, &plaintext).expect("seal");
        prop_assert!(open(&EncryptionKey::generate(), &sealed).is_err());
    }

    /// Property: flipping any byte after the header breaks authentication
    #[test]
    fn prop_tampering_detected(
        plaintext in prop::collection::vec(any::<u8>(), 1..128),
        position in any::<prop::sample::Index>(),
    ) {
        let key = EncryptionKey::generate();
        let mut sealed = seal(&key, EncryptionAlgorithm::default(), &plaintext).expect("seal");
        let idx = position.index(sealed.len());
        sealed[idx] ^= 0x01;
        prop_assert!(open(&key, &sealed).is_err());
    }
}

// ============================================================================
// Store Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: last write per key wins and plaintext never reaches the backend
    #[test]
    fn prop_store_roundtrip_and_confidentiality(
        writes in prop::collection::vec((key_strategy(), marker_strategy()), 1..8),
    ) {
        let rt = runtime();
        let backend = Arc::new(MemoryBackend::new());
        let store = EncryptedStore::new(
            backend.clone(),
            KeyManager::with_holder(Arc::new(MemoryCredentialHolder::new()), "secure_storage_key"),
        );

        let mut expected = BTreeMap::new();
        rt.block_on(async {
            for (key, value) in &writes {
                store.set_item(key, value).await.expect("set_item");
                expected.insert(key.clone(), value.clone());
            }
        });

        for (key, value) in &expected {
            let read: Option<String> = rt.block_on(store.get_item(key));
            prop_assert_eq!(read.as_ref(), Some(value));

            let raw = backend.raw(key).expect("raw value");
            prop_assert!(!contains(&raw, value.as_bytes()));
        }
    }

    /// Property: removing a key twice leaves the same state as removing once
    #[test]
    fn prop_remove_idempotent(
        keys in prop::collection::btree_set(key_strategy(), 1..6),
        victim_index in any::<prop::sample::Index>(),
    ) {
        let rt = runtime();
        let backend = Arc::new(MemoryBackend::new());
        let store = EncryptedStore::new(
            backend.clone(),
            KeyManager::with_holder(Arc::new(MemoryCredentialHolder::new()), "k"),
        );
        let keys: Vec<String> = keys.into_iter().collect();
        let victim = keys[victim_index.index(keys.len())].clone();

        rt.block_on(async {
            for key in &keys {
                store.set_item(key, &true).await.expect("set_item");
            }
            store.remove_item(&victim).await.expect("remove");
        });
        let once = backend.raw_entries();

        rt.block_on(store.remove_item(&victim)).expect("remove again");
        prop_assert_eq!(once, backend.raw_entries());
        prop_assert_eq!(backend.len(), keys.len() - 1);
    }
}
