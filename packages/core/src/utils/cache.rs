// Кеш с TTL для результатов запросов

use crate::utils::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Кеш, ключом которого служат параметры запроса.
///
/// Срок жизни проверяется при чтении; устаревшая запись считается
/// отсутствующей и перезаписывается следующим `get_or_fetch`.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &K, now: Instant) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&mut self, key: K, value: V, stored_at: Instant) {
        self.entries.insert(key, CacheEntry { value, stored_at });
    }

    /// Изменить свежее значение на месте; срок жизни не продлевается.
    /// `false`, если записи нет или она устарела
    pub fn update<F: FnOnce(&mut V)>(&mut self, key: &K, apply: F) -> bool {
        let ttl = self.ttl;
        match self.entries.get_mut(key) {
            Some(entry) if entry.stored_at.elapsed() < ttl => {
                apply(&mut entry.value);
                true
            }
            _ => false,
        }
    }

    pub fn invalidate(&mut self, key: &K) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Вернуть свежее значение из кеша или получить его через `fetch`.
    ///
    /// Ошибка `fetch` не кешируется и возвращается вызывающему.
    pub async fn get_or_fetch<F, Fut>(&mut self, key: K, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::NegotiationError;

    #[test]
    fn test_expiry_checked_on_read() {
        let mut cache = TtlCache::new(Duration::from_secs(30));
        let t0 = Instant::now();
        cache.insert_at("all", vec![1, 2], t0);

        assert_eq!(cache.get_at(&"all", t0 + Duration::from_secs(10)), Some(vec![1, 2]));
        assert_eq!(cache.get_at(&"all", t0 + Duration::from_secs(30)), None);
    }

    #[tokio::test]
    async fn test_get_or_fetch_hits_and_misses() {
        let mut cache: TtlCache<&str, u32> = TtlCache::new(Duration::from_secs(60));

        let first = cache.get_or_fetch("k", || async { Ok(7) }).await.unwrap();
        assert_eq!(first, 7);

        // Второй вызов не должен доходить до fetch
        let second = cache
            .get_or_fetch("k", || async { Err(NegotiationError::InternalError("unexpected".into())) })
            .await
            .unwrap();
        assert_eq!(second, 7);

        cache.invalidate(&"k");
        let failed = cache
            .get_or_fetch("k", || async { Err(NegotiationError::NetworkError("down".into())) })
            .await;
        assert!(failed.is_err());
        assert!(cache.get(&"k").is_none());
    }

    #[test]
    fn test_update_keeps_stored_at() {
        let mut cache = TtlCache::new(Duration::from_secs(30));
        let t0 = Instant::now();
        cache.insert_at("all", vec![1, 2], t0);

        assert!(cache.update(&"all", |v| v.push(3)));
        assert_eq!(cache.get(&"all"), Some(vec![1, 2, 3]));
        assert_eq!(cache.get_at(&"all", t0 + Duration::from_secs(30)), None);

        assert!(!cache.update(&"missing", |v| v.clear()));
    }
}
