//! Credential acquisition strategies.
//!
//! Reads may go out without a credential; writes always need one. The token
//! itself is opaque here: how it was obtained (personal token, OAuth sign-in)
//! is decided by the `CredentialSource` in use.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::cache::{LocalCache, OAUTH_TOKEN_KEY};
use crate::errors::ServiceError;

/// Opaque bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token; blank input yields `None`.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into().trim().to_string();
        (!token.is_empty()).then_some(Self(token))
    }

    pub fn bearer(&self) -> &str { &self.0 }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Current credential, if any.
    async fn credential(&self) -> Option<Credential>;
    /// Label for logs.
    fn kind(&self) -> &'static str;
}

/// Directly configured token (config file or environment).
#[derive(Debug, Clone, Default)]
pub struct StaticToken {
    token: Option<Credential>,
}

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self { token: token.and_then(Credential::new) }
    }

    pub fn none() -> Self { Self::default() }
}

#[async_trait]
impl CredentialSource for StaticToken {
    async fn credential(&self) -> Option<Credential> { self.token.clone() }
    fn kind(&self) -> &'static str { "static" }
}

/// Token obtained by an interactive OAuth sign-in, kept in the local cache
/// so the session survives restarts.
pub struct OAuthSession {
    cache: Arc<dyn LocalCache>,
}

impl OAuthSession {
    pub fn new(cache: Arc<dyn LocalCache>) -> Self { Self { cache } }

    /// Store the token handed back by the sign-in flow.
    pub async fn sign_in(&self, token: &str) -> Result<(), ServiceError> {
        let credential = Credential::new(token)
            .ok_or_else(|| ServiceError::Validation("token must not be empty".into()))?;
        self.cache.set(OAUTH_TOKEN_KEY, credential.bearer().to_string()).await?;
        info!("oauth_signed_in");
        Ok(())
    }

    /// Forget the stored token; returns whether one existed.
    pub async fn sign_out(&self) -> Result<bool, ServiceError> {
        let existed = self.cache.remove(OAUTH_TOKEN_KEY).await?;
        if existed {
            info!("oauth_signed_out");
        }
        Ok(existed)
    }

    pub async fn is_signed_in(&self) -> bool {
        self.credential().await.is_some()
    }
}

#[async_trait]
impl CredentialSource for OAuthSession {
    async fn credential(&self) -> Option<Credential> {
        self.cache.get(OAUTH_TOKEN_KEY).await.and_then(Credential::new)
    }

    fn kind(&self) -> &'static str { "oauth" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[tokio::test]
    async fn static_token_blank_is_none() {
        assert!(StaticToken::new(Some("  ".into())).credential().await.is_none());
        assert!(StaticToken::none().credential().await.is_none());
        let cred = StaticToken::new(Some("ghp_abc".into())).credential().await;
        assert_eq!(cred.as_ref().map(Credential::bearer), Some("ghp_abc"));
    }

    #[tokio::test]
    async fn oauth_session_lifecycle() -> Result<(), anyhow::Error> {
        let cache: Arc<dyn LocalCache> = Arc::new(MemoryCache::new());
        let session = OAuthSession::new(Arc::clone(&cache));
        assert!(!session.is_signed_in().await);
        assert!(session.sign_in(" ").await.is_err());

        session.sign_in("gho_token").await?;
        assert_eq!(session.credential().await.map(|c| c.bearer().to_string()), Some("gho_token".into()));

        // a second session over the same cache sees the token
        assert!(OAuthSession::new(cache).is_signed_in().await);

        assert!(session.sign_out().await?);
        assert!(!session.sign_out().await?);
        assert!(session.credential().await.is_none());
        Ok(())
    }

    #[test]
    fn debug_hides_secret() {
        let cred = Credential::new("secret").unwrap();
        assert_eq!(format!("{cred:?}"), "Credential(***)");
    }
}
