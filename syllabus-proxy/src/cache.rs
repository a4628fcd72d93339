use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task;
use tokio::time::{sleep, Duration, Instant};

pub struct Settings {
    pub enabled: bool,
    pub ttl: Duration,
}

struct Entry<V> {
    value: Arc<V>,
    expires: Instant,
}

/// Fetched sources keyed by URL. Entries expire after the configured TTL; a
/// disabled cache stores nothing.
pub struct Cache<K, V> {
    settings: Settings,
    inner: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    pub fn new(settings: Settings) -> Arc<Self> {
        Arc::new(Self {
            settings,
            inner: RwLock::default(),
        })
    }

    pub async fn insert(self: Arc<Self>, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        if !self.settings.enabled {
            return value;
        }

        let entry = Entry {
            value: Arc::clone(&value),
            expires: Instant::now() + self.settings.ttl,
        };
        self.inner.write().await.insert(key, entry);

        let cache = Arc::clone(&self);
        task::spawn(async move {
            sleep(cache.settings.ttl).await;
            cache.evict_expired().await;
        });

        value
    }

    pub async fn get(&self, key: &K) -> Option<Arc<V>> {
        if !self.settings.enabled {
            return None;
        }

        self.inner
            .read()
            .await
            .get(key)
            .filter(|entry| entry.expires > Instant::now())
            .map(|entry| Arc::clone(&entry.value))
    }

    async fn evict_expired(&self) {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        inner.retain(|_, entry| entry.expires > now);
        tracing::debug!(remaining = inner.len(), "evicted expired sources");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(enabled: bool, ttl: Duration) -> Arc<Cache<String, String>> {
        Cache::new(Settings { enabled, ttl })
    }

    #[tokio::test]
    async fn stores_and_returns() {
        let cache = cache(true, Duration::from_secs(60));
        Arc::clone(&cache)
            .insert("https://example.org/a".to_string(), "Jan 5 - Intro".to_string())
            .await;

        let hit = cache.get(&"https://example.org/a".to_string()).await;
        assert_eq!(hit.as_deref().map(String::as_str), Some("Jan 5 - Intro"));
        assert!(cache.get(&"https://example.org/b".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn disabled_stores_nothing() {
        let cache = cache(false, Duration::from_secs(60));
        let value = Arc::clone(&cache).insert("k".to_string(), "v".to_string()).await;

        assert_eq!(value.as_str(), "v");
        assert!(cache.get(&"k".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let cache = cache(true, Duration::ZERO);
        Arc::clone(&cache).insert("k".to_string(), "v".to_string()).await;

        assert!(cache.get(&"k".to_string()).await.is_none());
    }
}
