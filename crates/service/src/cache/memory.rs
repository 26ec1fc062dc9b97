use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::cache::LocalCache;
use crate::errors::ServiceError;

/// In-memory cache for tests and throwaway sessions.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: String) -> Result<(), ServiceError> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, ServiceError> {
        Ok(self.entries.lock().await.remove(key).is_some())
    }
}
