use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use terminly_core::error::{Result, TerminError};
use tokio::sync::Mutex;

use crate::TokenStore;

/// Token store backed by a single JSON object file.
///
/// The file is read once at open and rewritten whole on every `set`.
/// There is no schema versioning; losing the file just means the user
/// has to re-authorize.
pub struct FileTokenStore {
    path: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl FileTokenStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let cache = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                TerminError::Integration(format!(
                    "token file {} is not valid JSON: {e}",
                    path.display()
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(TerminError::Integration(format!(
                    "failed to read token file {}: {e}",
                    path.display()
                )))
            }
        };

        Ok(Self {
            path,
            cache: Mutex::new(cache),
        })
    }

    async fn persist(&self, cache: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(cache)
            .map_err(|e| TerminError::Integration(format!("token serialize failed: {e}")))?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            TerminError::Integration(format!(
                "failed to write token file {}: {e}",
                self.path.display()
            ))
        })
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.cache.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut cache = self.cache.lock().await;
        cache.insert(key.to_string(), value.to_string());
        self.persist(&cache).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terminly_core::types::new_id;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("terminly-tokens-{}.json", new_id()))
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let path = temp_path();
        let store = FileTokenStore::open(&path).await.unwrap();
        store.set("access_token", "abc").await.unwrap();
        assert_eq!(
            store.get("access_token").await.unwrap(),
            Some("abc".to_string())
        );
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let path = temp_path();
        {
            let store = FileTokenStore::open(&path).await.unwrap();
            store.set("refresh_token", "r1").await.unwrap();
        }
        let reopened = FileTokenStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.get("refresh_token").await.unwrap(),
            Some("r1".to_string())
        );
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let path = temp_path();
        let store = FileTokenStore::open(&path).await.unwrap();
        assert_eq!(store.get("access_token").await.unwrap(), None);
    }
}
