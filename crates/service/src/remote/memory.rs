use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::credentials::Credential;
use crate::remote::errors::StoreError;
use crate::remote::{DocumentStore, RemoteDocument, VersionToken};

/// In-memory document store for tests and offline demos.
///
/// Versions are `v1`, `v2`, ... per path. Knobs simulate the failure modes of
/// a hosted store: being offline, a private repository (public reads see
/// not-found), and a required token.
#[derive(Default)]
pub struct MemoryDocumentStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    docs: HashMap<String, (String, u64)>,
    offline: bool,
    private: bool,
    accepted_token: Option<String>,
    reads: usize,
    writes: usize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self { Self::default() }

    /// Fail every call with a network error.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Hide documents from reads that carry no credential.
    pub async fn set_private(&self, private: bool) {
        self.state.lock().await.private = private;
    }

    /// Only this token may write (and read when private). `None` accepts any.
    pub async fn accept_only(&self, token: Option<&str>) {
        self.state.lock().await.accepted_token = token.map(str::to_string);
    }

    /// Replace a document out of band, as another session would.
    pub async fn put_external(&self, path: &str, content: &str) -> VersionToken {
        let mut state = self.state.lock().await;
        let next = state.docs.get(path).map(|(_, v)| v + 1).unwrap_or(1);
        state.docs.insert(path.to_string(), (content.to_string(), next));
        VersionToken::new(format!("v{next}"))
    }

    pub async fn content(&self, path: &str) -> Option<String> {
        self.state.lock().await.docs.get(path).map(|(c, _)| c.clone())
    }

    pub async fn reads(&self) -> usize { self.state.lock().await.reads }

    pub async fn writes(&self) -> usize { self.state.lock().await.writes }
}

impl MemoryState {
    fn token_ok(&self, credential: &Credential) -> bool {
        self.accepted_token.as_deref().map_or(true, |t| t == credential.bearer())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn read(&self, path: &str, credential: Option<&Credential>) -> Result<Option<RemoteDocument>, StoreError> {
        let mut state = self.state.lock().await;
        state.reads += 1;
        if state.offline {
            return Err(StoreError::Network("store offline".into()));
        }
        if state.private {
            match credential {
                None => return Ok(None),
                Some(c) if !state.token_ok(c) => return Err(StoreError::Unauthorized),
                Some(_) => {}
            }
        }
        Ok(state.docs.get(path).map(|(content, v)| RemoteDocument {
            content: content.clone(),
            version: VersionToken::new(format!("v{v}")),
        }))
    }

    async fn write(
        &self,
        path: &str,
        content: &str,
        version: Option<&VersionToken>,
        credential: &Credential,
    ) -> Result<VersionToken, StoreError> {
        let mut state = self.state.lock().await;
        if state.offline {
            return Err(StoreError::Network("store offline".into()));
        }
        if !state.token_ok(credential) {
            return Err(StoreError::Unauthorized);
        }
        let current = state.docs.get(path).map(|(_, v)| VersionToken::new(format!("v{v}")));
        if current.as_ref() != version {
            return Err(StoreError::Conflict);
        }
        let next = state.docs.get(path).map(|(_, v)| v + 1).unwrap_or(1);
        state.docs.insert(path.to_string(), (content.to_string(), next));
        state.writes += 1;
        Ok(VersionToken::new(format!("v{next}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(t: &str) -> Credential { Credential::new(t).unwrap() }

    #[tokio::test]
    async fn versions_gate_writes() -> Result<(), StoreError> {
        let store = MemoryDocumentStore::new();
        assert_eq!(store.read("names.json", None).await?, None);

        let v1 = store.write("names.json", "[]", None, &cred("t")).await?;
        assert_eq!(v1.as_str(), "v1");
        // creating again without a token collides with the existing file
        assert_eq!(store.write("names.json", "[]", None, &cred("t")).await, Err(StoreError::Conflict));

        let v2 = store.write("names.json", "[1]", Some(&v1), &cred("t")).await?;
        assert_eq!(store.write("names.json", "[2]", Some(&v1), &cred("t")).await, Err(StoreError::Conflict));
        let doc = store.read("names.json", None).await?.unwrap();
        assert_eq!(doc.version, v2);
        assert_eq!(doc.content, "[1]");
        Ok(())
    }

    #[tokio::test]
    async fn private_and_token_checks() -> Result<(), StoreError> {
        let store = MemoryDocumentStore::new();
        store.accept_only(Some("good")).await;
        store.set_private(true).await;
        assert_eq!(store.write("p", "[]", None, &cred("bad")).await, Err(StoreError::Unauthorized));
        store.write("p", "[]", None, &cred("good")).await?;
        assert_eq!(store.read("p", None).await?, None);
        assert!(store.read("p", Some(&cred("good"))).await?.is_some());
        assert_eq!(store.read("p", Some(&cred("bad"))).await, Err(StoreError::Unauthorized));
        Ok(())
    }
}
