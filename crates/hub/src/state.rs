// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregated realtime state: the HTTP event ring plus per-agent
//! master/worker views, all TTL-bounded.

use std::collections::BTreeMap;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use dashcorn_core::{Clock, ExpiringFifo, IdleExpiringDict, RefreshMap, SystemClock};
use dashcorn_wire::{ControlPacket, HttpEvent, Metric, ProcInfo, WorkerStatus};

/// TTL and bound settings for the store.
#[derive(Debug, Clone)]
pub struct StateConfig {
    pub http_event_ttl: Duration,
    pub http_events_maxlen: usize,
    pub master_ttl: Duration,
    pub worker_ttl: Duration,
    pub workers_maxlen: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            http_event_ttl: Duration::from_secs(60),
            http_events_maxlen: 10_000,
            master_ttl: Duration::from_secs(5),
            worker_ttl: Duration::from_secs(5),
            workers_maxlen: 100,
        }
    }
}

struct AgentEntry<C: Clock> {
    master: IdleExpiringDict<String, serde_json::Value, C>,
    workers: RefreshMap<String, ProcInfo, C>,
    last_index: i64,
    heartbeat: u64,
}

impl<C: Clock> AgentEntry<C> {
    fn new(config: &StateConfig, clock: C) -> Self {
        Self {
            master: IdleExpiringDict::with_clock(config.master_ttl, clock.clone()),
            workers: RefreshMap::with_clock(
                config.worker_ttl,
                Some(config.workers_maxlen),
                clock,
            ),
            last_index: -1,
            heartbeat: 0,
        }
    }

    fn snapshot(&self) -> AgentSnapshot {
        let mut master = serde_json::Map::new();
        for (key, value) in self.master.snapshot() {
            master.insert(key, value);
        }
        AgentSnapshot { master, workers: self.workers.entries().into_iter().collect() }
    }
}

/// Live view of one agent: merged master fields plus per-worker samples.
#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub master: serde_json::Map<String, serde_json::Value>,
    pub workers: BTreeMap<String, ProcInfo>,
}

impl AgentSnapshot {
    /// Master start time, when master info is live.
    pub fn master_start_time(&self) -> Option<f64> {
        self.master.get("start_time").and_then(serde_json::Value::as_f64)
    }

    /// Master pid rendered as a label, `"master"` when unknown.
    pub fn master_pid_label(&self) -> String {
        match self.master.get("pid").and_then(serde_json::Value::as_u64) {
            Some(pid) => pid.to_string(),
            None => "master".to_string(),
        }
    }
}

/// The `{http, server}` shape served by the JSON API.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub http: Vec<HttpEvent>,
    pub server: BTreeMap<String, AgentSnapshot>,
}

/// The hub's shared in-memory store.
pub struct RealtimeState<C: Clock = SystemClock> {
    http_events: ExpiringFifo<HttpEvent, C>,
    servers: Mutex<IndexMap<String, AgentEntry<C>>>,
    config: StateConfig,
    clock: C,
}

impl RealtimeState<SystemClock> {
    pub fn new(config: StateConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl Default for RealtimeState<SystemClock> {
    fn default() -> Self {
        Self::new(StateConfig::default())
    }
}

impl<C: Clock> RealtimeState<C> {
    pub fn with_clock(config: StateConfig, clock: C) -> Self {
        Self {
            http_events: ExpiringFifo::with_clock(
                Some(config.http_event_ttl),
                Some(config.http_events_maxlen),
                clock.clone(),
            ),
            servers: Mutex::new(IndexMap::new()),
            config,
            clock,
        }
    }

    /// Route one decoded telemetry message into the store.
    pub fn apply(&self, metric: Metric) {
        match metric {
            Metric::Http(event) => self.record_http(event),
            Metric::WorkerStatus(status) => self.record_server(status),
        }
    }

    pub fn record_http(&self, event: HttpEvent) {
        self.http_events.append(event);
    }

    pub fn record_server(&self, status: WorkerStatus) {
        if status.agent_id.is_empty() {
            debug!("dropping worker status without agent_id");
            return;
        }
        let mut servers = self.servers.lock();
        let entry = servers
            .entry(status.agent_id.clone())
            .or_insert_with(|| AgentEntry::new(&self.config, self.clock.clone()));

        if let Some(master) = status.master {
            match serde_json::to_value(&master) {
                Ok(serde_json::Value::Object(fields)) => entry.master.update(fields),
                _ => debug!("unrepresentable master info for {}", status.agent_id),
            }
        }
        for (worker_id, info) in status.workers {
            entry.workers.set(worker_id, info);
        }
    }

    /// Round-robin election over the live workers of every agent.
    ///
    /// The packet carries the pre-advance index and pre-increment heartbeat;
    /// a fresh agent (index -1) therefore elects its most recently added
    /// worker first. The heartbeat ticks every election round, with or
    /// without candidates.
    pub fn elect_leaders(&self) -> Vec<ControlPacket> {
        let mut servers = self.servers.lock();
        let mut packets = Vec::new();
        for (agent_id, entry) in servers.iter_mut() {
            let heartbeat = entry.heartbeat;
            entry.heartbeat += 1;

            let candidates: Vec<u32> = entry
                .workers
                .entries()
                .into_iter()
                .map(|(_, info)| info.pid)
                .filter(|pid| *pid != 0)
                .collect();
            if candidates.is_empty() {
                debug!("no active workers found for leader election");
                continue;
            }

            let len = candidates.len() as i64;
            let index = entry.last_index.rem_euclid(len) as usize;
            entry.last_index = (entry.last_index + 1).rem_euclid(len);
            packets.push(ControlPacket {
                agent_id: agent_id.clone(),
                leader: candidates[index],
                heartbeat,
            });
        }
        packets
    }

    /// Snapshot of the live HTTP events, oldest first.
    pub fn http_events(&self) -> Vec<HttpEvent> {
        self.http_events.items()
    }

    /// Atomically drain the HTTP events.
    pub fn drain_http_events(&self) -> Vec<HttpEvent> {
        self.http_events.drain()
    }

    /// Live master/worker views for every agent.
    pub fn all_servers(&self) -> BTreeMap<String, AgentSnapshot> {
        let servers = self.servers.lock();
        servers.iter().map(|(id, entry)| (id.clone(), entry.snapshot())).collect()
    }

    /// The full JSON snapshot: `{http: [...], server: {...}}`.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot { http: self.http_events(), server: self.all_servers() }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
