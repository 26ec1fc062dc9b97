//! Device identity: the id that marks records as "posted by you".

use tracing::info;
use uuid::Uuid;

use crate::cache::{LocalCache, USER_ID_KEY};
use crate::errors::ServiceError;

/// Return this device's user id, generating and caching one on first use.
/// The id authorizes deleting one's own records; it is not authentication.
pub async fn local_user_id(cache: &dyn LocalCache) -> Result<String, ServiceError> {
    if let Some(existing) = cache.get(USER_ID_KEY).await.filter(|id| !id.trim().is_empty()) {
        return Ok(existing);
    }
    let id = format!("user_{}", Uuid::new_v4().simple());
    cache.set(USER_ID_KEY, id.clone()).await?;
    info!(user_id = %id, "generated_local_user_id");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[tokio::test]
    async fn id_is_generated_once() -> Result<(), anyhow::Error> {
        let cache = MemoryCache::new();
        let first = local_user_id(&cache).await?;
        assert!(first.starts_with("user_"));
        assert_eq!(local_user_id(&cache).await?, first);
        Ok(())
    }

    #[tokio::test]
    async fn existing_id_is_kept() -> Result<(), anyhow::Error> {
        let cache = MemoryCache::new();
        cache.set(USER_ID_KEY, "user_1700000000000".into()).await?;
        assert_eq!(local_user_id(&cache).await?, "user_1700000000000");
        Ok(())
    }
}
