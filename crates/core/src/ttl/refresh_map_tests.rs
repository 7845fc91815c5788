// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::*;
use crate::clock::FakeClock;

fn map(ttl_secs: u64, max_len: Option<usize>) -> (RefreshMap<String, u32, FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    (RefreshMap::with_clock(Duration::from_secs(ttl_secs), max_len, clock.clone()), clock)
}

#[test]
fn entries_expire_after_ttl() {
    let (map, clock) = map(5, None);
    map.set("a".into(), 1);
    clock.advance(Duration::from_secs(4));
    assert_eq!(map.get(&"a".into()), Some(1));
    clock.advance(Duration::from_secs(2));
    assert_eq!(map.get(&"a".into()), None);
    assert_eq!(map.len(), 0);
}

#[test]
fn set_refreshes_the_ttl() {
    let (map, clock) = map(3, None);
    map.set("a".into(), 1);
    clock.advance(Duration::from_secs(2));
    map.set("a".into(), 2);
    clock.advance(Duration::from_secs(2));
    // 4s since the first write, 2s since the refresh
    assert_eq!(map.get(&"a".into()), Some(2));
}

#[test]
fn overflow_evicts_least_recently_set() {
    let (map, _clock) = map(60, Some(3));
    for (i, key) in ["a", "b", "c"].iter().enumerate() {
        map.set(key.to_string(), i as u32);
    }
    // Refreshing "a" moves it to the most-recent position
    map.set("a".into(), 10);
    map.set("d".into(), 3);
    map.set("e".into(), 4);
    assert_eq!(map.keys(), vec!["a".to_string(), "d".into(), "e".into()]);
}

#[test]
fn exactly_k_overflow_evictions() {
    let (map, _clock) = map(60, Some(5));
    for i in 0..8u32 {
        map.set(format!("k{i}"), i);
    }
    assert_eq!(map.len(), 5);
    assert_eq!(
        map.keys(),
        vec!["k3".to_string(), "k4".into(), "k5".into(), "k6".into(), "k7".into()]
    );
}

#[test]
fn on_expire_fires_for_eviction_and_expiry() {
    let (map, clock) = map(5, Some(2));
    let dropped = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&dropped);
    map.set_on_expire(move |_k, _v| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    map.set("a".into(), 1);
    map.set("b".into(), 2);
    map.set("c".into(), 3); // evicts "a"
    assert_eq!(dropped.load(Ordering::SeqCst), 1);

    clock.advance(Duration::from_secs(6));
    map.cleanup(); // expires "b" and "c"
    assert_eq!(dropped.load(Ordering::SeqCst), 3);
}

#[test]
fn remove_returns_live_values_only() {
    let (map, clock) = map(5, None);
    map.set("a".into(), 1);
    assert_eq!(map.remove(&"a".into()), Some(1));
    assert_eq!(map.remove(&"a".into()), None);

    map.set("b".into(), 2);
    clock.advance(Duration::from_secs(6));
    assert_eq!(map.remove(&"b".into()), None);
}

#[test]
fn set_default_inserts_on_miss() {
    let (map, _clock) = map(5, None);
    assert_eq!(map.set_default("a".into(), 7), 7);
    map.set("a".into(), 1);
    assert_eq!(map.set_default("a".into(), 7), 1);
}

#[test]
fn get_set_time_tracks_writes() {
    let (map, clock) = map(5, None);
    map.set("a".into(), 1);
    let first = map.get_set_time(&"a".into()).unwrap();
    clock.advance(Duration::from_secs(1));
    map.set("a".into(), 2);
    let second = map.get_set_time(&"a".into()).unwrap();
    assert!(second > first);
    assert_eq!(map.get_set_time(&"missing".into()), None);
}

#[test]
fn update_and_clear() {
    let (map, _clock) = map(5, None);
    map.update(vec![("a".to_string(), 1), ("b".to_string(), 2)]);
    assert_eq!(map.len(), 2);
    map.clear();
    assert!(map.is_empty());
}

#[tokio::test]
async fn cleaner_task_purges_expired_entries() {
    let clock = FakeClock::new();
    let map: RefreshMap<String, u32, FakeClock> =
        RefreshMap::with_clock(Duration::from_secs(1), None, clock.clone());
    map.set("a".into(), 1);
    let handle = map.spawn_cleaner(Duration::from_millis(10));

    clock.advance(Duration::from_secs(2));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(map.shared.store.lock().is_empty());

    drop(map);
    // Task notices the dropped map on its next tick.
    tokio::time::timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
}
