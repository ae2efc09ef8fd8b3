use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};

use crate::services::store::SessionStore;
use crate::session::state::SessionSnapshot;

/// Debounced writer for one session's cache entry. Any number of changes
/// inside one quantum produce a single write.
pub(crate) struct Persister {
    store: Arc<dyn SessionStore>,
    key: String,
    debounce: Duration,
    deadline: Option<Instant>,
    writes: u64,
}

impl Persister {
    pub(crate) fn new(store: Arc<dyn SessionStore>, key: String, debounce: Duration) -> Self {
        Self { store, key, debounce, deadline: None, writes: 0 }
    }

    pub(crate) async fn load(store: &dyn SessionStore, key: &str) -> Option<SessionSnapshot> {
        let raw = match store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(key, error = %err, "Failed to read persisted session");
                return None;
            }
        };

        match serde_json::from_str::<SessionSnapshot>(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(key, error = %err, "Ignoring corrupt persisted session");
                None
            }
        }
    }

    pub(crate) fn schedule(&mut self) {
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.debounce);
        }
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolves when a scheduled write is due; pending forever otherwise.
    pub(crate) async fn due(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }

    pub(crate) async fn flush(&mut self, snapshot: &SessionSnapshot) {
        self.deadline = None;
        let raw = match serde_json::to_string(snapshot) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!(key = %self.key, error = %err, "Failed to encode session snapshot");
                return;
            }
        };
        match self.store.set(&self.key, raw).await {
            Ok(()) => {
                self.writes += 1;
                tracing::trace!(key = %self.key, writes = self.writes, "Session persisted");
            }
            Err(err) => tracing::warn!(key = %self.key, error = %err, "Failed to persist session"),
        }
    }

    pub(crate) async fn clear(&mut self) {
        self.deadline = None;
        if let Err(err) = self.store.remove(&self.key).await {
            tracing::warn!(key = %self.key, error = %err, "Failed to clear persisted session");
        }
    }

    #[cfg(test)]
    pub(crate) fn writes(&self) -> u64 {
        self.writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;

    fn snapshot(timer: u64) -> SessionSnapshot {
        SessionSnapshot { answers: Default::default(), timer: Some(timer), warnings: 0, last_violation: None }
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_coalesces_until_due() {
        let store = Arc::new(MemoryStore::new());
        let mut persister = Persister::new(store.clone(), "exam-u-t".to_string(), Duration::from_millis(16));

        let started = Instant::now();
        persister.schedule();
        persister.schedule();
        persister.schedule();
        persister.due().await;
        assert_eq!(started.elapsed(), Duration::from_millis(16));

        persister.flush(&snapshot(42)).await;
        assert_eq!(persister.writes(), 1);
        assert!(!persister.is_pending());
        assert_eq!(Persister::load(store.as_ref(), "exam-u-t").await, Some(snapshot(42)));
    }

    #[tokio::test]
    async fn load_ignores_corrupt_entries() {
        let store = MemoryStore::new();
        store.set("exam-u-t", "{not json".to_string()).await.expect("set");
        assert_eq!(Persister::load(&store, "exam-u-t").await, None);
        assert_eq!(Persister::load(&store, "missing").await, None);
    }

    #[tokio::test]
    async fn clear_removes_entry_and_pending_write() {
        let store = Arc::new(MemoryStore::new());
        let mut persister = Persister::new(store.clone(), "exam-u-t".to_string(), Duration::from_millis(16));
        persister.flush(&snapshot(10)).await;
        persister.schedule();

        persister.clear().await;
        assert!(!persister.is_pending());
        assert_eq!(store.get("exam-u-t").await.expect("get"), None);
    }
}
