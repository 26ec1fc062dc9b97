use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::LocalCache;
use crate::errors::ServiceError;
use crate::storage::json_map_store::JsonMapStore;

/// File-backed cache, one JSON object per device.
#[derive(Clone)]
pub struct FileCache {
    store: JsonMapStore,
}

impl FileCache {
    pub async fn open<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let store = JsonMapStore::open(path).await?;
        Ok(Arc::new(Self { store }))
    }

    pub fn path(&self) -> &std::path::Path { self.store.path() }
}

#[async_trait]
impl LocalCache for FileCache {
    async fn get(&self, key: &str) -> Option<String> { self.store.get(key).await }
    async fn set(&self, key: &str, value: String) -> Result<(), ServiceError> { self.store.insert(key, value).await }
    async fn remove(&self, key: &str) -> Result<bool, ServiceError> { self.store.remove(key).await }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{SNAPSHOT_KEY, VERSION_TOKEN_KEY};

    #[tokio::test]
    async fn file_cache_survives_restart() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("namerator_cache_{}.json", uuid::Uuid::new_v4()));
        let cache = FileCache::open(&tmp).await?;
        cache.set(VERSION_TOKEN_KEY, "sha-1".into()).await?;
        cache.set(SNAPSHOT_KEY, "[]".into()).await?;

        let cache2 = FileCache::open(&tmp).await?;
        assert_eq!(cache2.get(VERSION_TOKEN_KEY).await.as_deref(), Some("sha-1"));
        assert_eq!(cache2.get(SNAPSHOT_KEY).await.as_deref(), Some("[]"));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
