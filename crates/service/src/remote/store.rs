use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use models::Snapshot;

use crate::cache::{LocalCache, SNAPSHOT_KEY, VERSION_TOKEN_KEY};
use crate::credentials::CredentialSource;
use crate::errors::ServiceError;
use crate::events::Notice;
use crate::observability;
use crate::remote::errors::StoreError;
use crate::remote::{DocumentStore, RemoteDocument, VersionToken};

/// Where a pulled snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// Fresh copy of the remote document.
    Remote,
    /// The remote document does not exist yet; empty snapshot.
    Missing,
    /// Remote unreachable; local fallback copy.
    Cached,
    /// Remote unreachable and no fallback copy; empty snapshot.
    Unavailable,
}

impl SnapshotOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            SnapshotOrigin::Remote => "remote",
            SnapshotOrigin::Missing => "missing",
            SnapshotOrigin::Cached => "cached",
            SnapshotOrigin::Unavailable => "unavailable",
        }
    }

    pub fn is_degraded(self) -> bool {
        matches!(self, SnapshotOrigin::Cached | SnapshotOrigin::Unavailable)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pulled {
    pub snapshot: Snapshot,
    pub origin: SnapshotOrigin,
}

impl Pulled {
    /// Notice to surface for degraded pulls.
    pub fn notice(&self) -> Option<Notice> {
        match self.origin {
            SnapshotOrigin::Cached => Some(Notice::UsingCachedData),
            SnapshotOrigin::Unavailable => Some(Notice::LoadFailed),
            SnapshotOrigin::Remote | SnapshotOrigin::Missing => None,
        }
    }
}

/// Single-document persistence with a local fallback copy.
///
/// Owns the cached version token: it is refreshed by every successful pull
/// and push and left untouched by failed ones.
pub struct RemoteStore {
    documents: Arc<dyn DocumentStore>,
    credentials: Arc<dyn CredentialSource>,
    cache: Arc<dyn LocalCache>,
    path: String,
    write_gate: Mutex<()>,
}

impl RemoteStore {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        credentials: Arc<dyn CredentialSource>,
        cache: Arc<dyn LocalCache>,
        path: impl Into<String>,
    ) -> Self {
        Self { documents, credentials, cache, path: path.into(), write_gate: Mutex::new(()) }
    }

    pub fn path(&self) -> &str { &self.path }

    pub async fn cached_version(&self) -> Option<VersionToken> {
        self.cache.get(VERSION_TOKEN_KEY).await.map(VersionToken::new)
    }

    pub async fn has_credential(&self) -> bool {
        self.credentials.credential().await.is_some()
    }

    /// Fetch the latest snapshot: public read, then authenticated read, then
    /// the local fallback copy, then empty.
    #[instrument(skip(self), fields(path = %self.path))]
    pub async fn pull(&self) -> Pulled {
        let pulled = match self.read_remote().await {
            Ok(Some(doc)) => match Snapshot::from_json(&doc.content) {
                Ok(snapshot) => {
                    self.remember(&snapshot, Some(&doc.version)).await;
                    debug!(version = %doc.version, records = snapshot.len(), "pulled remote snapshot");
                    Pulled { snapshot, origin: SnapshotOrigin::Remote }
                }
                Err(e) => {
                    warn!(error = %e, "remote document is not a valid snapshot");
                    self.fallback().await
                }
            },
            Ok(None) => {
                info!("remote document missing; starting empty");
                if let Err(e) = self.cache.remove(VERSION_TOKEN_KEY).await {
                    warn!(error = %e, "cannot clear cached version token");
                }
                Pulled { snapshot: Snapshot::empty(), origin: SnapshotOrigin::Missing }
            }
            Err(e) => {
                warn!(error = %e, "remote read failed");
                self.fallback().await
            }
        };
        observability::PULLS_TOTAL.with_label_values(&[pulled.origin.as_str()]).inc();
        pulled
    }

    async fn read_remote(&self) -> Result<Option<RemoteDocument>, StoreError> {
        match self.documents.read(&self.path, None).await {
            Ok(Some(doc)) => Ok(Some(doc)),
            public => match self.credentials.credential().await {
                Some(credential) => {
                    debug!(public_error = ?public.as_ref().err(), "retrying read with credential");
                    self.documents.read(&self.path, Some(&credential)).await
                }
                None => public,
            },
        }
    }

    async fn fallback(&self) -> Pulled {
        let cached = self.cache.get(SNAPSHOT_KEY).await;
        match cached.as_deref().map(Snapshot::from_json) {
            Some(Ok(snapshot)) => Pulled { snapshot, origin: SnapshotOrigin::Cached },
            Some(Err(e)) => {
                warn!(error = %e, "cached snapshot unreadable");
                Pulled { snapshot: Snapshot::empty(), origin: SnapshotOrigin::Unavailable }
            }
            None => Pulled { snapshot: Snapshot::empty(), origin: SnapshotOrigin::Unavailable },
        }
    }

    /// Cache a snapshot (and token) after a successful exchange. Cache
    /// failures only cost the offline fallback, so they are logged.
    async fn remember(&self, snapshot: &Snapshot, version: Option<&VersionToken>) {
        if let Some(version) = version {
            if let Err(e) = self.cache.set(VERSION_TOKEN_KEY, version.to_string()).await {
                warn!(error = %e, "cannot cache version token");
            }
        }
        if let Err(e) = self.cache_snapshot(snapshot).await {
            warn!(error = %e, "cannot cache snapshot");
        }
    }

    async fn cache_snapshot(&self, snapshot: &Snapshot) -> Result<(), ServiceError> {
        self.cache.set(SNAPSHOT_KEY, snapshot.to_json()?).await
    }

    /// Write `snapshot` as the new remote document.
    ///
    /// The snapshot is cached locally before anything else, so it survives a
    /// failed write. Version conflicts are reported, never retried or merged.
    #[instrument(skip(self, snapshot), fields(path = %self.path, records = snapshot.len()))]
    pub async fn push(&self, snapshot: &Snapshot) -> Result<VersionToken, ServiceError> {
        let _gate = self.write_gate.lock().await;

        if let Err(e) = self.cache_snapshot(snapshot).await {
            warn!(error = %e, "cannot cache snapshot before push");
        }

        let result = self.write_remote(snapshot).await;
        let label = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        observability::PUSHES_TOTAL.with_label_values(&[label]).inc();
        result
    }

    async fn write_remote(&self, snapshot: &Snapshot) -> Result<VersionToken, ServiceError> {
        let Some(credential) = self.credentials.credential().await else {
            info!(source = self.credentials.kind(), "no credential; write skipped");
            return Err(ServiceError::AuthorizationRequired);
        };
        let content = snapshot.to_json_pretty()?;
        let version = self.cached_version().await;

        match self.documents.write(&self.path, &content, version.as_ref(), &credential).await {
            Ok(new_version) => {
                if let Err(e) = self.cache.set(VERSION_TOKEN_KEY, new_version.to_string()).await {
                    warn!(error = %e, "cannot cache new version token");
                }
                info!(version = %new_version, "snapshot pushed");
                Ok(new_version)
            }
            Err(e) => {
                warn!(error = %e, previous = ?version, "push rejected");
                Err(e.into())
            }
        }
    }
}
