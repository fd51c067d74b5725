// ==========================================
// Cadet Roster - Stale-then-refresh cache
// ==========================================
// Read-through cache with eventual consistency:
//   fresh hit  → cached value
//   stale hit  → cached value now, reload in the background
//   miss       → load, store, return
// invalidate() drops an entry so the next read loads synchronously.
// ==========================================

use crate::domain::{Person, PersonKind};
use dashmap::DashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Registry listings per registry kind; invalidated after every import.
pub type RosterCache = StaleCache<PersonKind, Arc<Vec<Person>>>;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    loaded_at: Instant,
    /// Bumped on every store; a background reload only lands if unchanged.
    generation: u64,
}

pub struct StaleCache<K, V> {
    entries: Arc<DashMap<K, Entry<V>>>,
    refreshing: Arc<DashMap<K, ()>>,
    ttl: Duration,
}

impl<K, V> Clone for StaleCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            refreshing: self.refreshing.clone(),
            ttl: self.ttl,
        }
    }
}

impl<K, V> StaleCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            refreshing: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Cached value regardless of age.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|e| e.value.clone())
    }

    pub fn insert(&self, key: K, value: V) {
        let generation = self.entries.get(&key).map_or(0, |e| e.generation + 1);
        self.entries.insert(
            key,
            Entry {
                value,
                loaded_at: Instant::now(),
                generation,
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
    }

    /// Returns the cached value (reloading stale entries in the background)
    /// or awaits `loader` on a miss.
    pub async fn get_stale_then_refresh<F, Fut, E>(&self, key: K, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let cached = self
            .entries
            .get(&key)
            .map(|e| (e.value.clone(), e.loaded_at.elapsed() < self.ttl, e.generation));

        match cached {
            Some((value, true, _)) => Ok(value),
            Some((value, false, generation)) => {
                self.spawn_refresh(key, generation, loader);
                Ok(value)
            }
            None => {
                let value = loader().await?;
                self.insert(key, value.clone());
                Ok(value)
            }
        }
    }

    fn spawn_refresh<F, Fut, E>(&self, key: K, generation: u64, loader: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        // at most one reload per key in flight
        if self.refreshing.insert(key.clone(), ()).is_some() {
            return;
        }
        let entries = self.entries.clone();
        let refreshing = self.refreshing.clone();
        tokio::spawn(async move {
            match loader().await {
                Ok(value) => {
                    // skip if invalidated or overwritten meanwhile
                    if let Some(mut entry) = entries.get_mut(&key) {
                        if entry.generation == generation {
                            entry.value = value;
                            entry.loaded_at = Instant::now();
                            entry.generation += 1;
                            debug!("cache entry refreshed");
                        }
                    }
                }
                Err(e) => warn!(error = %e, "background cache refresh failed; keeping stale value"),
            }
            refreshing.remove(&key);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_loader(
        calls: Arc<AtomicUsize>,
    ) -> impl FnOnce() -> std::pin::Pin<Box<dyn Future<Output = Result<usize, String>> + Send>> {
        move || {
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(n)
            })
        }
    }

    #[tokio::test]
    async fn test_miss_then_fresh_hit() {
        let cache: StaleCache<&'static str, usize> = StaleCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let v = cache
            .get_stale_then_refresh("roster", counting_loader(calls.clone()))
            .await
            .unwrap();
        assert_eq!(v, 1);
        let v = cache
            .get_stale_then_refresh("roster", counting_loader(calls.clone()))
            .await
            .unwrap();
        assert_eq!(v, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_value_served_then_refreshed() {
        let cache: StaleCache<&'static str, usize> = StaleCache::new(Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get_stale_then_refresh("roster", counting_loader(calls.clone()))
            .await
            .unwrap();
        let stale = cache
            .get_stale_then_refresh("roster", counting_loader(calls.clone()))
            .await
            .unwrap();
        assert_eq!(stale, 1);

        for _ in 0..50 {
            if cache.peek(&"roster") == Some(2) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(cache.peek(&"roster"), Some(2));
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let cache: StaleCache<&'static str, usize> = StaleCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));
        cache
            .get_stale_then_refresh("roster", counting_loader(calls.clone()))
            .await
            .unwrap();
        cache.invalidate(&"roster");
        assert_eq!(cache.peek(&"roster"), None);
        let v = cache
            .get_stale_then_refresh("roster", counting_loader(calls.clone()))
            .await
            .unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test]
    async fn test_loader_error_on_miss_is_returned() {
        let cache: StaleCache<&'static str, usize> = StaleCache::new(Duration::from_secs(60));
        let result = cache
            .get_stale_then_refresh("roster", || async { Err::<usize, String>("db down".to_string()) })
            .await;
        assert_eq!(result, Err("db down".to_string()));
        assert_eq!(cache.peek(&"roster"), None);
    }
}
