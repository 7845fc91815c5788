// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded FIFO whose entries age out from the front.
//!
//! Entries are stamped on insertion; any access first purges entries older
//! than the TTL. Overflow beyond the maximum length drops the oldest entry.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};

struct Shared<V, C: Clock> {
    data: Mutex<VecDeque<(Instant, V)>>,
    ttl: Option<Duration>,
    max_len: Option<usize>,
    clock: C,
}

/// Shared handle to an expiring FIFO.
pub struct ExpiringFifo<V, C: Clock = SystemClock> {
    shared: Arc<Shared<V, C>>,
}

impl<V, C: Clock> Clone for ExpiringFifo<V, C> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<V> ExpiringFifo<V, SystemClock>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Option<Duration>, max_len: Option<usize>) -> Self {
        Self::with_clock(ttl, max_len, SystemClock)
    }
}

impl<V, C> ExpiringFifo<V, C>
where
    V: Clone + Send + Sync + 'static,
    C: Clock,
{
    pub fn with_clock(ttl: Option<Duration>, max_len: Option<usize>, clock: C) -> Self {
        Self {
            shared: Arc::new(Shared {
                data: Mutex::new(VecDeque::new()),
                ttl,
                max_len,
                clock,
            }),
        }
    }

    /// Append to the tail; overflow drops the oldest entry.
    pub fn append(&self, value: V) {
        let now = self.shared.clock.now();
        let mut data = self.shared.data.lock();
        Self::purge(&mut data, now, self.shared.ttl);
        data.push_back((now, value));
        if let Some(max_len) = self.shared.max_len {
            if data.len() > max_len {
                data.pop_front();
            }
        }
    }

    /// Push at the head; overflow drops the newest entry.
    pub fn append_front(&self, value: V) {
        let now = self.shared.clock.now();
        let mut data = self.shared.data.lock();
        Self::purge(&mut data, now, self.shared.ttl);
        data.push_front((now, value));
        if let Some(max_len) = self.shared.max_len {
            if data.len() > max_len {
                data.pop_back();
            }
        }
    }

    /// Live entries, oldest first.
    pub fn items(&self) -> Vec<V> {
        let now = self.shared.clock.now();
        let mut data = self.shared.data.lock();
        Self::purge(&mut data, now, self.shared.ttl);
        data.iter().map(|(_, v)| v.clone()).collect()
    }

    /// Atomically take every live entry, leaving the queue empty.
    pub fn drain(&self) -> Vec<V> {
        let now = self.shared.clock.now();
        let mut data = self.shared.data.lock();
        Self::purge(&mut data, now, self.shared.ttl);
        data.drain(..).map(|(_, v)| v).collect()
    }

    pub fn len(&self) -> usize {
        let now = self.shared.clock.now();
        let mut data = self.shared.data.lock();
        Self::purge(&mut data, now, self.shared.ttl);
        data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.shared.data.lock().clear();
    }

    fn purge(data: &mut VecDeque<(Instant, V)>, now: Instant, ttl: Option<Duration>) {
        let Some(ttl) = ttl else {
            return;
        };
        while let Some((stamp, _)) = data.front() {
            if now.duration_since(*stamp) > ttl {
                data.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "expiring_fifo_tests.rs"]
mod tests;
