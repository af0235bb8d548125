//! Read-through TTL cache with an injectable clock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Every this many inserts, expired entries are swept.
pub const PURGE_EVERY: usize = 256;

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Tokio's clock, so paused test runtimes move it too.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// TTL-only invalidation. Expired entries are dropped on read, swept every
/// [`PURGE_EVERY`] inserts, or by `purge_expired`.
pub struct Cache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<K, Entry<V>>>,
    inserts: AtomicUsize,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: Mutex::new(HashMap::new()),
            inserts: AtomicUsize::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        if self.inserts.fetch_add(1, Ordering::Relaxed) % PURGE_EVERY == PURGE_EVERY - 1 {
            let before = entries.len();
            entries.retain(|_, entry| entry.expires_at > now);
            log::trace!("Cache sweep dropped {} expired entries", before - entries.len());
        }
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.lock().remove(key);
    }

    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl_secs: u64) -> (Cache<String, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        (
            Cache::with_clock(Duration::from_secs(ttl_secs), clock.clone()),
            clock,
        )
    }

    #[test]
    fn hit_within_ttl() {
        let (cache, clock) = cache(60);
        cache.insert("a".into(), 1);
        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get(&"a".to_string()), Some(1));
    }

    #[test]
    fn miss_after_ttl() {
        let (cache, clock) = cache(60);
        cache.insert("a".into(), 1);
        clock.advance(Duration::from_secs(60));
        assert_eq!(cache.get(&"a".to_string()), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_refreshes_expiry() {
        let (cache, clock) = cache(10);
        cache.insert("a".into(), 1);
        clock.advance(Duration::from_secs(8));
        cache.insert("a".into(), 2);
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get(&"a".to_string()), Some(2));
    }

    #[test]
    fn purge_drops_only_expired() {
        let (cache, clock) = cache(10);
        cache.insert("old".into(), 1);
        clock.advance(Duration::from_secs(6));
        cache.insert("new".into(), 2);
        clock.advance(Duration::from_secs(6));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        cache.invalidate(&"new".to_string());
        assert!(cache.is_empty());
    }

    #[test]
    fn unread_keys_do_not_accumulate() {
        let (cache, clock) = cache(1);
        for i in 0..10_000u32 {
            cache.insert(format!("cell:{i}"), i);
            clock.advance(Duration::from_secs(2));
            assert!(cache.len() <= PURGE_EVERY);
        }
    }

    #[test]
    fn sweep_keeps_live_entries() {
        let (cache, _clock) = cache(60);
        for i in 0..1_000u32 {
            cache.insert(format!("cell:{i}"), i);
        }
        assert_eq!(cache.len(), 1_000);
        assert_eq!(cache.get(&"cell:0".to_string()), Some(0));
    }
}
