//! Wiring: config in, a ready `BusinessRegistry` out.

use std::sync::Arc;
use std::time::Duration;

use configs::{AppConfig, CredentialMode};
use tracing::info;

use crate::cache::{FileCache, LocalCache};
use crate::credentials::{CredentialSource, OAuthSession, StaticToken};
use crate::errors::ServiceError;
use crate::identity::local_user_id;
use crate::registry::BusinessRegistry;
use crate::remote::{DocumentStore, GitHubContents, RemoteStore};
use crate::sync::SyncTask;

pub struct App {
    pub config: AppConfig,
    pub registry: Arc<BusinessRegistry>,
    pub user_id: String,
    /// Present when `auth.mode = "oauth"`.
    pub oauth: Option<Arc<OAuthSession>>,
}

impl App {
    /// Open the cache file and talk to the configured GitHub repository.
    pub async fn bootstrap(config: AppConfig) -> Result<Self, ServiceError> {
        let cache = FileCache::open(config.cache.path.clone()).await?;
        let documents = Arc::new(GitHubContents::new(&config.remote)?);
        Self::assemble(config, documents, cache).await
    }

    /// Build on any document store and cache.
    pub async fn assemble(
        config: AppConfig,
        documents: Arc<dyn DocumentStore>,
        cache: Arc<dyn LocalCache>,
    ) -> Result<Self, ServiceError> {
        let user_id = local_user_id(cache.as_ref()).await?;

        let oauth = match config.auth.mode {
            CredentialMode::Static => None,
            CredentialMode::Oauth => Some(Arc::new(OAuthSession::new(cache.clone()))),
        };
        let credentials: Arc<dyn CredentialSource> = match &oauth {
            Some(session) => session.clone(),
            None => Arc::new(StaticToken::new(config.auth.token.clone())),
        };

        info!(
            owner = %config.remote.owner,
            repo = %config.remote.repo,
            path = %config.remote.path,
            credentials = credentials.kind(),
            "app assembled"
        );

        let remote = RemoteStore::new(documents, credentials, cache, config.remote.path.clone());
        let registry = Arc::new(BusinessRegistry::new(Arc::new(remote)));
        Ok(Self { config, registry, user_id, oauth })
    }

    pub fn sync_period(&self) -> Duration {
        Duration::from_secs(self.config.sync.interval_secs)
    }

    pub fn start_sync(&self) -> SyncTask {
        SyncTask::spawn(self.registry.clone(), self.sync_period())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::registry::Persistence;
    use crate::remote::MemoryDocumentStore;
    use models::Category;

    #[tokio::test]
    async fn oauth_mode_writes_after_sign_in() -> Result<(), anyhow::Error> {
        let mut config = AppConfig::default();
        config.auth.mode = CredentialMode::Oauth;
        let app = App::assemble(config, Arc::new(MemoryDocumentStore::new()), Arc::new(MemoryCache::new())).await?;

        let first = app.registry.create("Before", Category::Punny, &app.user_id).await?;
        assert!(matches!(first.persistence, Persistence::LocalOnly(_)));

        app.oauth.as_ref().expect("oauth session").sign_in("gho_token").await?;
        let second = app.registry.create("After", Category::Punny, &app.user_id).await?;
        assert!(matches!(second.persistence, Persistence::Saved(_)));
        Ok(())
    }

    #[tokio::test]
    async fn user_id_is_stable_per_cache() -> Result<(), anyhow::Error> {
        let cache: Arc<dyn LocalCache> = Arc::new(MemoryCache::new());
        let docs = Arc::new(MemoryDocumentStore::new());
        let a = App::assemble(AppConfig::default(), docs.clone(), cache.clone()).await?;
        let b = App::assemble(AppConfig::default(), docs, cache).await?;
        assert_eq!(a.user_id, b.user_id);
        assert!(a.user_id.starts_with("user_"));
        assert!(a.oauth.is_none());
        Ok(())
    }
}
