//! Periodic background pull.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::registry::BusinessRegistry;

/// Handle to the background sync loop. Dropping it stops the loop.
pub struct SyncTask {
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncTask {
    /// Start ticking every `period`. The first tick fires one period from now.
    /// A tick that is still running when the next is due makes that one skip.
    pub fn spawn(registry: Arc<BusinessRegistry>, period: Duration) -> Self {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(period_secs = period.as_secs_f64(), "sync loop started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let changed = registry.sync_tick().await;
                        debug!(changed, "sync tick");
                    }
                    res = stopped.changed() => {
                        if res.is_err() || *stopped.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("sync loop stopped");
        });
        Self { stop, handle: Some(handle) }
    }

    /// Stop the loop and wait for the current tick, if any, to finish.
    pub async fn stop(mut self) {
        self.stop.send_replace(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for SyncTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::credentials::StaticToken;
    use crate::events::{Notice, RegistryEvent};
    use crate::remote::{MemoryDocumentStore, RemoteStore};

    fn registry_on(docs: Arc<MemoryDocumentStore>) -> Arc<BusinessRegistry> {
        let remote = RemoteStore::new(
            docs,
            Arc::new(StaticToken::none()),
            Arc::new(MemoryCache::new()),
            "names.json",
        );
        Arc::new(BusinessRegistry::new(Arc::new(remote)))
    }

    #[tokio::test]
    async fn picks_up_external_writes() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let registry = registry_on(docs.clone());
        registry.load().await;
        let mut rx = registry.subscribe();

        let task = SyncTask::spawn(registry.clone(), Duration::from_millis(20));
        docs.put_external("names.json", r#"[{"name":"Elsewhere","category":"punny"}]"#).await;

        let heard = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Ok(RegistryEvent::Notice(Notice::NewDataAvailable)) = rx.recv().await {
                    break;
                }
            }
        })
        .await;
        assert!(heard.is_ok(), "no NewDataAvailable within timeout");
        assert_eq!(registry.len().await, 1);
        task.stop().await;
    }

    #[tokio::test]
    async fn stop_ends_the_loop() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let registry = registry_on(docs.clone());
        let task = SyncTask::spawn(registry, Duration::from_millis(10));
        assert!(task.is_running());
        tokio::time::sleep(Duration::from_millis(35)).await;
        task.stop().await;

        let reads = docs.reads().await;
        assert!(reads >= 1);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(docs.reads().await, reads);
    }

    #[tokio::test]
    async fn first_tick_waits_one_period() {
        let docs = Arc::new(MemoryDocumentStore::new());
        let task = SyncTask::spawn(registry_on(docs.clone()), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(docs.reads().await, 0);
        drop(task);
    }
}
