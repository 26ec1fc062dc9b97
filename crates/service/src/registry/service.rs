use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, info, instrument, warn};

use models::{BusinessRecord, Category, Rating, RatingChange, RatingSummary, RecordId, Snapshot};

use crate::errors::ServiceError;
use crate::events::{Notice, Phase, RegistryEvent};
use crate::observability;
use crate::registry::state::{Outcome, PersistIntent, Registry};
use crate::remote::{Pulled, RemoteStore, SnapshotOrigin, VersionToken};

const EVENT_CAPACITY: usize = 64;

/// What happened to the remote copy after a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Persistence {
    Saved(VersionToken),
    /// The mutation changed nothing.
    NotNeeded,
    /// The write failed; the change lives in memory and the local cache only.
    LocalOnly(Notice),
}

/// A mutation applied to local state, with its persistence result.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied<T> {
    pub value: T,
    pub persistence: Persistence,
}

/// Registry service: applies mutations optimistically and persists each
/// resulting snapshot through the `RemoteStore`.
///
/// Local state is never rolled back when a write fails; the failure is
/// reported as a `Notice` and the next successful write carries the change.
///
/// # Examples
/// ```
/// use std::sync::Arc;
/// use models::Category;
/// use service::cache::MemoryCache;
/// use service::credentials::StaticToken;
/// use service::registry::{BusinessRegistry, Persistence};
/// use service::remote::{MemoryDocumentStore, RemoteStore};
///
/// let remote = RemoteStore::new(
///     Arc::new(MemoryDocumentStore::new()),
///     Arc::new(StaticToken::new(Some("token".into()))),
///     Arc::new(MemoryCache::new()),
///     "names.json",
/// );
/// let registry = BusinessRegistry::new(Arc::new(remote));
/// let applied = tokio_test::block_on(registry.create("Bread Pitt", Category::Punny, "user_1")).unwrap();
/// assert!(matches!(applied.persistence, Persistence::Saved(_)));
/// assert_eq!(tokio_test::block_on(registry.len()), 1);
/// ```
pub struct BusinessRegistry {
    state: RwLock<Registry>,
    remote: Arc<RemoteStore>,
    events: broadcast::Sender<RegistryEvent>,
    phase: watch::Sender<Phase>,
}

impl BusinessRegistry {
    pub fn new(remote: Arc<RemoteStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (phase, _) = watch::channel(Phase::Idle);
        Self { state: RwLock::new(Registry::default()), remote, events, phase }
    }

    pub fn remote(&self) -> &RemoteStore { &self.remote }

    /// Render triggers and notices, from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    fn emit(&self, event: RegistryEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn notify(&self, notice: Notice) {
        debug!(%notice, "notice");
        self.emit(RegistryEvent::Notice(notice));
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.send_replace(phase);
    }

    // ---- reads ----

    pub async fn snapshot(&self) -> Snapshot {
        self.state.read().await.snapshot().clone()
    }

    pub async fn records(&self) -> Vec<BusinessRecord> {
        self.state.read().await.snapshot().records().to_vec()
    }

    pub async fn get(&self, id: RecordId) -> Option<BusinessRecord> {
        self.state.read().await.snapshot().get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.snapshot().len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn rating_summary(&self, id: RecordId) -> Option<RatingSummary> {
        self.state.read().await.snapshot().get(id).map(BusinessRecord::rating_summary)
    }

    pub async fn user_rating(&self, id: RecordId, user_id: &str) -> Option<Rating> {
        self.state.read().await.snapshot().get(id).and_then(|r| r.rating_of(user_id))
    }

    pub async fn is_author(&self, id: RecordId, user_id: &str) -> bool {
        self.state.read().await.snapshot().get(id).is_some_and(|r| r.is_author(user_id))
    }

    pub async fn storage_usage(&self) -> String {
        self.state.read().await.snapshot().storage_usage()
    }

    pub async fn resolve(&self, needle: &str) -> Result<RecordId, ServiceError> {
        self.state.read().await.resolve(needle)
    }

    // ---- mutations ----

    /// Run a command against local state, then persist if it asks for it.
    async fn commit<T, F>(&self, op: &'static str, command: F) -> Result<Applied<T>, ServiceError>
    where
        F: FnOnce(&mut Registry) -> Result<Outcome<T>, ServiceError>,
    {
        self.set_phase(Phase::Mutating);
        let outcome = {
            let mut state = self.state.write().await;
            command(&mut *state)
        };
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(op, error = %e, "mutation rejected");
                self.set_phase(Phase::Idle);
                self.emit(RegistryEvent::Render);
                return Err(e);
            }
        };

        let persistence = match outcome.intent {
            PersistIntent::Skip => Persistence::NotNeeded,
            PersistIntent::Write(snapshot) => {
                observability::MUTATIONS_TOTAL.with_label_values(&[op]).inc();
                self.set_phase(Phase::Persisting);
                self.persist(op, &snapshot).await
            }
        };

        self.set_phase(Phase::Idle);
        self.emit(RegistryEvent::Render);
        Ok(Applied { value: outcome.value, persistence })
    }

    async fn persist(&self, op: &'static str, snapshot: &Snapshot) -> Persistence {
        match self.remote.push(snapshot).await {
            Ok(version) => Persistence::Saved(version),
            Err(e) => {
                let notice = match e {
                    ServiceError::AuthorizationRequired => Notice::SignInRequired,
                    ServiceError::VersionConflict => Notice::VersionConflict,
                    _ => Notice::SavedLocallyOnly,
                };
                warn!(op, error = %e, "change kept locally");
                self.notify(notice.clone());
                Persistence::LocalOnly(notice)
            }
        }
    }

    #[instrument(skip(self, category), fields(category = %category))]
    pub async fn create(&self, name: &str, category: Category, author_id: &str) -> Result<Applied<BusinessRecord>, ServiceError> {
        let applied = self.commit("create", |reg| reg.create(name, category, author_id)).await?;
        info!(id = %applied.value.id, "business_created");
        Ok(applied)
    }

    /// Toggle a rating; `value` is `None` when `id` is unknown.
    #[instrument(skip(self))]
    pub async fn rate(&self, id: RecordId, user_id: &str, rating: u8) -> Result<Applied<Option<RatingChange>>, ServiceError> {
        self.commit("rate", |reg| reg.rate(id, user_id, rating)).await
    }

    /// Delete a record owned by `requester_id`; returns whether one was removed.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: RecordId, requester_id: &str) -> Result<Applied<bool>, ServiceError> {
        let applied = self.commit("delete", |reg| Ok(reg.delete(id, requester_id))).await?;
        Ok(Applied { value: applied.value.is_some(), persistence: applied.persistence })
    }

    #[instrument(skip(self))]
    pub async fn clear_all(&self) -> Result<Applied<usize>, ServiceError> {
        let applied = self.commit("clear_all", |reg| Ok(reg.clear_all())).await?;
        info!(removed = applied.value, "registry_cleared");
        Ok(applied)
    }

    #[instrument(skip(self))]
    pub async fn fix_legacy(&self, caller_id: &str) -> Result<Applied<usize>, ServiceError> {
        let now = Utc::now();
        let applied = self.commit("fix_legacy", |reg| Ok(reg.fix_legacy(caller_id, now))).await?;
        self.notify(Notice::LegacyFixed(applied.value));
        Ok(applied)
    }

    // ---- reconciliation ----

    /// Adopt a pulled snapshot unless the pull found nothing at all.
    /// Returns whether local state changed.
    async fn adopt(&self, pulled: Pulled) -> bool {
        if let Some(notice) = pulled.notice() {
            self.notify(notice);
        }
        if pulled.origin == SnapshotOrigin::Unavailable {
            return false;
        }
        self.state.write().await.replace(pulled.snapshot)
    }

    /// Initial pull at startup.
    #[instrument(skip(self))]
    pub async fn load(&self) -> SnapshotOrigin {
        let pulled = self.remote.pull().await;
        let origin = pulled.origin;
        self.adopt(pulled).await;
        self.emit(RegistryEvent::Render);
        let records = self.len().await;
        info!(origin = origin.as_str(), records, "registry_loaded");
        origin
    }

    /// Pull and replace local state, discarding unsaved local changes.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> SnapshotOrigin {
        let pulled = self.remote.pull().await;
        let origin = pulled.origin;
        self.adopt(pulled).await;
        if !origin.is_degraded() {
            self.notify(Notice::Refreshed);
        }
        self.emit(RegistryEvent::Render);
        origin
    }

    fn is_idle(&self) -> bool {
        *self.phase.borrow() == Phase::Idle
    }

    /// Periodic pull. Replaces local state only when the remote copy differs.
    /// Skipped when a mutation is in flight before the pull, or still in
    /// flight once the pull returns. Returns whether state changed.
    pub async fn sync_tick(&self) -> bool {
        if !self.is_idle() {
            debug!("mutation in flight; sync tick skipped");
            return false;
        }
        let pulled = self.remote.pull().await;
        if let Some(notice) = pulled.notice() {
            self.notify(notice);
        }
        let changed = if pulled.origin == SnapshotOrigin::Unavailable {
            false
        } else {
            let mut state = self.state.write().await;
            // a mutation that began during the pull owns the newer state
            if !self.is_idle() {
                debug!("mutation started during pull; result discarded");
                false
            } else {
                state.replace(pulled.snapshot)
            }
        };
        if changed {
            observability::SYNC_CHANGES_TOTAL.inc();
            let records = self.len().await;
            info!(records, "remote_changes_adopted");
            self.notify(Notice::NewDataAvailable);
        }
        self.emit(RegistryEvent::Render);
        changed
    }
}
