//! Remote persistence of the shared snapshot.
//!
//! `DocumentStore` is the contract of the hosted content API (one versioned
//! file per path). `RemoteStore` layers the read fallbacks, the local cache
//! and the version-token bookkeeping on top of it.

pub mod errors;
pub mod github;
pub mod memory;
pub mod store;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::credentials::Credential;
use errors::StoreError;

pub use github::GitHubContents;
pub use memory::MemoryDocumentStore;
pub use store::{Pulled, RemoteStore, SnapshotOrigin};

/// Opaque value gating optimistic-concurrency writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(raw: impl Into<String>) -> Self { Self(raw.into()) }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Document content as read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocument {
    pub content: String,
    pub version: VersionToken,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the document at `path`. `Ok(None)` means it does not exist.
    async fn read(&self, path: &str, credential: Option<&Credential>) -> Result<Option<RemoteDocument>, StoreError>;

    /// Replace the document at `path`. Without a version token the write
    /// creates the document; with one, it must match the stored version.
    async fn write(
        &self,
        path: &str,
        content: &str,
        version: Option<&VersionToken>,
        credential: &Credential,
    ) -> Result<VersionToken, StoreError>;
}
