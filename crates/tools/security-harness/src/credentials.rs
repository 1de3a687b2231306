//! Development credential holder backed by a JSON file.
//!
//! Secrets sit unprotected on disk. Only for exercising the store from the
//! command line; real hosts use Keychain / Android Keystore.

use async_trait::async_trait;
use newsbite_storage::{Error, Result, SecureCredentialHolder};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;

pub struct FileCredentialHolder {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCredentialHolder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        tracing::warn!(
            "Using development credential file {}; the storage key is not protected",
            path.display()
        );
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(Error::Keystore(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl SecureCredentialHolder for FileCredentialHolder {
    async fn get(&self, alias: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(alias))
    }

    async fn set(&self, alias: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(alias.to_string(), value.to_string());

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Keystore(e.to_string()))?;
        }
        let json = serde_json::to_vec_pretty(&entries)?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| Error::Keystore(format!("Failed to write {}: {}", self.path.display(), e)))
    }
}
