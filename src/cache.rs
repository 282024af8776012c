// src/cache.rs
//! Size-bounded, time-expiring stores for resolved entities. One instance per
//! entity kind; all of them live on the facade and are shared by the trackers.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("entity_cache_hits_total", "Cache lookups served locally.");
        describe_counter!(
            "entity_cache_misses_total",
            "Cache lookups that fell through to upstream."
        );
    });
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// Associative store with a TTL and a capacity bound. Mutation goes through a
/// single mutex; the guard is never held across an await point. Entries are
/// written all-or-nothing: only fully populated values are inserted.
pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(name: &'static str, ttl: Duration, capacity: usize) -> Self {
        ensure_metrics_described();
        Self {
            name,
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// A present, non-expired entry is authoritative.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let entries = self.entries.lock().expect("cache mutex poisoned");
        let hit = entries
            .get(key)
            .filter(|e| !self.expired(e, now))
            .map(|e| e.value.clone());
        if hit.is_some() {
            counter!("entity_cache_hits_total", "cache" => self.name).increment(1);
        } else {
            counter!("entity_cache_misses_total", "cache" => self.name).increment(1);
        }
        hit
    }

    pub fn insert(&self, key: K, value: V) {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.insert(
            key,
            Entry {
                value,
                inserted_at: now,
            },
        );
        self.evict(&mut entries, now);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        now.duration_since(entry.inserted_at) >= self.ttl
    }

    /// Drop expired entries, then the oldest-inserted while over capacity.
    fn evict(&self, entries: &mut HashMap<K, Entry<V>>, now: Instant) {
        entries.retain(|_, e| !self.expired(e, now));
        while entries.len() > self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.inserted_at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                }
                None => break,
            }
        }
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_entry_is_returned_until_ttl() {
        let cache = TtlCache::new("t", Duration::from_secs(3600), 10);
        cache.insert(1u32, "one".to_string());
        assert_eq!(cache.get(&1), Some("one".to_string()));
    }

    #[test]
    fn zero_ttl_entry_is_expired_immediately() {
        let cache = TtlCache::new("t", Duration::ZERO, 10);
        cache.insert(1u32, "one".to_string());
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn capacity_pressure_evicts_oldest_first() {
        let cache = TtlCache::new("t", Duration::from_secs(3600), 2);
        cache.insert(1u32, "a".to_string());
        std::thread::sleep(Duration::from_millis(5));
        cache.insert(2u32, "b".to_string());
        std::thread::sleep(Duration::from_millis(5));
        cache.insert(3u32, "c".to_string());

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&2), Some("b".to_string()));
        assert_eq!(cache.get(&3), Some("c".to_string()));
    }

    #[test]
    fn entry_expires_after_its_ttl_elapses() {
        let cache = TtlCache::new("t", Duration::from_millis(40), 10);
        cache.insert(1u32, "one".to_string());
        assert_eq!(cache.get(&1), Some("one".to_string()));
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get(&1), None);
    }

    #[test]
    fn reinsert_refreshes_value() {
        let cache = TtlCache::new("t", Duration::from_secs(3600), 10);
        cache.insert(1u32, "a".to_string());
        cache.insert(1u32, "b".to_string());
        assert_eq!(cache.get(&1), Some("b".to_string()));
        assert_eq!(cache.len(), 1);
    }
}
