// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mapping with a per-entry TTL that refreshes on every write.
//!
//! Each `set` stamps the entry with the current monotonic time and moves the
//! key to the most-recent position. Reads of entries older than the TTL
//! behave as a miss. When a maximum length is configured, overflow evicts
//! the least-recently-set entry.

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};

type ExpireCallback<K, V> = Arc<dyn Fn(&K, &V) + Send + Sync>;

struct Entry<V> {
    value: V,
    set_at: Instant,
}

struct Shared<K, V, C: Clock> {
    store: Mutex<IndexMap<K, Entry<V>>>,
    ttl: Duration,
    max_len: Option<usize>,
    on_expire: Mutex<Option<ExpireCallback<K, V>>>,
    clock: C,
}

/// Shared handle to a refresh-on-set TTL map.
pub struct RefreshMap<K, V, C: Clock = SystemClock> {
    shared: Arc<Shared<K, V, C>>,
}

impl<K, V, C: Clock> Clone for RefreshMap<K, V, C> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<K, V> RefreshMap<K, V, SystemClock>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Unbounded map on the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, None, SystemClock)
    }

    /// Bounded map on the system clock.
    pub fn bounded(ttl: Duration, max_len: usize) -> Self {
        Self::with_clock(ttl, Some(max_len), SystemClock)
    }
}

impl<K, V, C> RefreshMap<K, V, C>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: Clock,
{
    pub fn with_clock(ttl: Duration, max_len: Option<usize>, clock: C) -> Self {
        Self {
            shared: Arc::new(Shared {
                store: Mutex::new(IndexMap::new()),
                ttl,
                max_len,
                on_expire: Mutex::new(None),
                clock,
            }),
        }
    }

    /// Register a callback invoked with every entry dropped by TTL expiry or
    /// LRU eviction. Callbacks run outside the store lock.
    pub fn set_on_expire(&self, callback: impl Fn(&K, &V) + Send + Sync + 'static) {
        *self.shared.on_expire.lock() = Some(Arc::new(callback));
    }

    /// Insert or refresh an entry, moving it to the most-recent position.
    pub fn set(&self, key: K, value: V) {
        let now = self.shared.clock.now();
        let mut evicted = Vec::new();
        {
            let mut store = self.shared.store.lock();
            // Re-inserting moves the key to the tail of the index order.
            store.shift_remove(&key);
            store.insert(key, Entry { value, set_at: now });
            if let Some(max_len) = self.shared.max_len {
                while store.len() > max_len {
                    match store.shift_remove_index(0) {
                        Some((k, entry)) => evicted.push((k, entry.value)),
                        None => break,
                    }
                }
            }
        }
        self.notify_expired(evicted);
    }

    /// Fetch a live entry. Entries past their TTL are removed and read as a
    /// miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.shared.clock.now();
        let mut expired = Vec::new();
        let value = {
            let mut store = self.shared.store.lock();
            let is_expired = match store.get(key) {
                Some(entry) => now.duration_since(entry.set_at) > self.shared.ttl,
                None => return None,
            };
            if is_expired {
                if let Some((k, entry)) = store.shift_remove_entry(key) {
                    expired.push((k, entry.value));
                }
                None
            } else {
                store.get(key).map(|entry| entry.value.clone())
            }
        };
        self.notify_expired(expired);
        value
    }

    /// Remove and return a live entry. An expired entry is dropped through
    /// the expiry callback and reads as a miss.
    pub fn remove(&self, key: &K) -> Option<V> {
        let now = self.shared.clock.now();
        let mut expired = Vec::new();
        let value = {
            let mut store = self.shared.store.lock();
            match store.shift_remove_entry(key) {
                Some((k, entry)) if now.duration_since(entry.set_at) > self.shared.ttl => {
                    expired.push((k, entry.value));
                    None
                }
                Some((_, entry)) => Some(entry.value),
                None => None,
            }
        };
        self.notify_expired(expired);
        value
    }

    /// Fetch the entry, inserting `default` on a miss.
    pub fn set_default(&self, key: K, default: V) -> V {
        if let Some(value) = self.get(&key) {
            return value;
        }
        self.set(key, default.clone());
        default
    }

    /// Insert every pair from `entries`.
    pub fn update(&self, entries: impl IntoIterator<Item = (K, V)>) {
        for (key, value) in entries {
            self.set(key, value);
        }
    }

    /// The monotonic time of the last write to `key`, if present. Does not
    /// consult the TTL; exposed for tests.
    pub fn get_set_time(&self, key: &K) -> Option<Instant> {
        self.shared.store.lock().get(key).map(|entry| entry.set_at)
    }

    /// Drop every expired entry.
    pub fn cleanup(&self) {
        let now = self.shared.clock.now();
        let mut expired = Vec::new();
        {
            let mut store = self.shared.store.lock();
            store.retain(|key, entry| {
                if now.duration_since(entry.set_at) > self.shared.ttl {
                    expired.push((key.clone(), entry.value.clone()));
                    false
                } else {
                    true
                }
            });
        }
        self.notify_expired(expired);
    }

    /// Live entry count.
    pub fn len(&self) -> usize {
        self.cleanup();
        self.shared.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live keys in least-recently-set order.
    pub fn keys(&self) -> Vec<K> {
        self.cleanup();
        self.shared.store.lock().keys().cloned().collect()
    }

    /// Live entries in least-recently-set order.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.cleanup();
        self.shared
            .store
            .lock()
            .iter()
            .map(|(k, entry)| (k.clone(), entry.value.clone()))
            .collect()
    }

    pub fn clear(&self) {
        self.shared.store.lock().clear();
    }

    /// Spawn a background task that runs [`cleanup`](Self::cleanup) every
    /// `interval`. The task exits once the last map handle is dropped.
    pub fn spawn_cleaner(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                let map = RefreshMap { shared };
                map.cleanup();
            }
        })
    }

    fn notify_expired(&self, dropped: Vec<(K, V)>) {
        if dropped.is_empty() {
            return;
        }
        let callback = self.shared.on_expire.lock().clone();
        if let Some(callback) = callback {
            for (key, value) in &dropped {
                callback(key, value);
            }
        }
    }
}

#[cfg(test)]
#[path = "refresh_map_tests.rs"]
mod tests;
