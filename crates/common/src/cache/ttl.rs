//! TTL cache keyed by `K`, measured on an injectable [`Clock`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::time::{Clock, SystemClock};

#[derive(Debug)]
struct CacheEntry<V> {
    value: Arc<V>,
    inserted_at: Instant,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
}

/// Thread-safe cache whose entries expire `ttl` after insertion.
///
/// Expiry is measured from insertion, not from the last read, so a value is
/// never served for longer than `ttl` after it was loaded. A zero `ttl`
/// disables caching: inserts are not retained and every `get` misses.
///
/// Every `insert`, `remove` and `clear` advances a generation counter. A
/// loader that reads its backing store outside the writer's lock takes
/// [`TtlCache::generation`] before the read and stores the result with
/// [`TtlCache::insert_if_generation`], which drops it when a write landed in
/// between.
pub struct TtlCache<K, V, C = SystemClock>
where
    K: Eq + Hash,
    C: Clock,
{
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    ttl: Duration,
    clock: C,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    generation: AtomicU64,
}

impl<K, V> TtlCache<K, V, SystemClock>
where
    K: Eq + Hash,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<K, V, C> TtlCache<K, V, C>
where
    K: Eq + Hash,
    C: Clock,
{
    /// Create a cache with a custom clock (useful for testing)
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Store `value` and return the shared handle that later hits return.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        self.insert_arc(key, Arc::new(value))
    }

    pub fn insert_arc(&self, key: K, value: Arc<V>) -> Arc<V> {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        if self.is_enabled() {
            let entry = CacheEntry { value: Arc::clone(&value), inserted_at: self.clock.now() };
            entries.insert(key, entry);
            self.inserts.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Current write generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Store a value loaded while the cache was at `generation`.
    ///
    /// The value is returned either way but only retained when no
    /// `insert`, `remove` or `clear` happened since.
    pub fn insert_if_generation(&self, key: K, value: V, generation: u64) -> Arc<V> {
        let value = Arc::new(value);
        if !self.is_enabled() {
            return value;
        }
        let mut entries = self.entries.write();
        if self.generation.load(Ordering::Acquire) == generation {
            let entry = CacheEntry { value: Arc::clone(&value), inserted_at: self.clock.now() };
            entries.insert(key, entry);
            self.inserts.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// The cached value, if present and younger than `ttl`.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !self.is_expired(entry, now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(Arc::clone(&entry.value));
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // expired: drop it unless another writer replaced it meanwhile
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|entry| self.is_expired(entry, now)) {
            entries.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.remove(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop expired entries; returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.inserted_at) < self.ttl);
        before - entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
        }
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.duration_since(entry.inserted_at) >= self.ttl
    }
}

impl<K, V, C> std::fmt::Debug for TtlCache<K, V, C>
where
    K: Eq + Hash,
    C: Clock,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache").field("ttl", &self.ttl).field("len", &self.len()).finish()
    }
}
