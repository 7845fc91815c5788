// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mapping that drops its entire contents once idle past a TTL.
//!
//! "Idle" means no write. Every operation consults the clock first, so a
//! stale map empties itself before the operation completes.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};

struct State<K, V> {
    entries: HashMap<K, V>,
    last_write: Instant,
}

struct Shared<K, V, C: Clock> {
    state: Mutex<State<K, V>>,
    ttl: Duration,
    clock: C,
}

/// Shared handle to an idle-expiring map.
pub struct IdleExpiringDict<K, V, C: Clock = SystemClock> {
    shared: Arc<Shared<K, V, C>>,
}

impl<K, V, C: Clock> Clone for IdleExpiringDict<K, V, C> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<K, V> IdleExpiringDict<K, V, SystemClock>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<K, V, C> IdleExpiringDict<K, V, C>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    C: Clock,
{
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        let now = clock.now();
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State { entries: HashMap::new(), last_write: now }),
                ttl,
                clock,
            }),
        }
    }

    pub fn set(&self, key: K, value: V) {
        let now = self.shared.clock.now();
        let mut state = self.shared.state.lock();
        self.maybe_expire(&mut state, now);
        state.entries.insert(key, value);
        state.last_write = now;
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.shared.clock.now();
        let mut state = self.shared.state.lock();
        self.maybe_expire(&mut state, now);
        state.entries.get(key).cloned()
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let now = self.shared.clock.now();
        let mut state = self.shared.state.lock();
        self.maybe_expire(&mut state, now);
        let removed = state.entries.remove(key);
        state.last_write = now;
        removed
    }

    /// Merge every pair from `entries` in one write.
    pub fn update(&self, entries: impl IntoIterator<Item = (K, V)>) {
        let now = self.shared.clock.now();
        let mut state = self.shared.state.lock();
        self.maybe_expire(&mut state, now);
        state.entries.extend(entries);
        state.last_write = now;
    }

    pub fn len(&self) -> usize {
        let now = self.shared.clock.now();
        let mut state = self.shared.state.lock();
        self.maybe_expire(&mut state, now);
        state.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let now = self.shared.clock.now();
        let mut state = self.shared.state.lock();
        state.entries.clear();
        state.last_write = now;
    }

    /// Copy of the live contents.
    pub fn snapshot(&self) -> HashMap<K, V> {
        let now = self.shared.clock.now();
        let mut state = self.shared.state.lock();
        self.maybe_expire(&mut state, now);
        state.entries.clone()
    }

    fn maybe_expire(&self, state: &mut State<K, V>, now: Instant) {
        if now.duration_since(state.last_write) >= self.shared.ttl {
            state.entries.clear();
        }
    }
}

#[cfg(test)]
#[path = "idle_dict_tests.rs"]
mod tests;
