// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics-exposition aggregation.
//!
//! [`MetricsExporter`] folds drained HTTP events into per-label accumulators
//! and, on each scrape, turns the accumulators plus the live server state
//! into metric families. Families are value types rebuilt per scrape; the
//! accumulators underneath are the only registered state.

mod render;
mod scheduler;

pub use render::{FamilyKind, MetricFamily, Sample};
pub use scheduler::ExportScheduler;

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::warn;

use dashcorn_core::{Clock, SystemClock};

use crate::state::RealtimeState;

/// Events younger than this still count as in progress at aggregation time.
const IN_PROGRESS_WINDOW_SECS: f64 = 4.0;

/// All exposition metric names under one prefix (default `uvicorn`).
#[derive(Debug, Clone)]
pub struct MetricNames {
    pub requests_total: String,
    pub requests_by_worker_total: String,
    pub requests_duration_seconds: String,
    pub requests_duration_seconds_sum: String,
    pub requests_duration_seconds_count: String,
    pub requests_in_progress: String,
    pub worker_cpu_percent: String,
    pub worker_memory_bytes: String,
    pub worker_thread_count: String,
    pub worker_uptime_seconds: String,
    pub master_uptime_seconds: String,
    pub total_cpu_percent: String,
    pub total_memory_bytes: String,
    pub active_worker_count: String,
}

impl MetricNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            requests_total: format!("{prefix}_requests_total"),
            requests_by_worker_total: format!("{prefix}_requests_by_worker_total"),
            requests_duration_seconds: format!("{prefix}_requests_duration_seconds"),
            requests_duration_seconds_sum: format!("{prefix}_requests_duration_seconds_sum"),
            requests_duration_seconds_count: format!("{prefix}_requests_duration_seconds_count"),
            requests_in_progress: format!("{prefix}_requests_in_progress"),
            worker_cpu_percent: format!("{prefix}_worker_cpu_percent"),
            worker_memory_bytes: format!("{prefix}_worker_memory_bytes"),
            worker_thread_count: format!("{prefix}_worker_thread_count"),
            worker_uptime_seconds: format!("{prefix}_worker_uptime_seconds"),
            master_uptime_seconds: format!("{prefix}_master_uptime_seconds"),
            total_cpu_percent: format!("{prefix}_total_cpu_percent"),
            total_memory_bytes: format!("{prefix}_total_memory_bytes"),
            active_worker_count: format!("{prefix}_active_worker_count"),
        }
    }
}

impl Default for MetricNames {
    fn default() -> Self {
        Self::with_prefix("uvicorn")
    }
}

#[derive(Default)]
struct Accumulators {
    /// (agent_id, method, path, status) → request count
    total: IndexMap<(String, String, String, String), u64>,
    /// (agent_id, pid) → request count
    by_worker: IndexMap<(String, String), u64>,
    /// (agent_id, method, path) → summed duration
    duration_sum: IndexMap<(String, String, String), f64>,
    /// (agent_id, method, path) → duration sample count
    duration_count: IndexMap<(String, String, String), u64>,
    /// (agent_id, method, path) → in-progress gauge, reset each tick
    in_progress: IndexMap<(String, String, String), u64>,
}

/// Aggregates drained HTTP events and renders scrape output.
pub struct MetricsExporter<C: Clock = SystemClock> {
    state: Arc<RealtimeState<C>>,
    names: MetricNames,
    accum: Mutex<Accumulators>,
    clock: C,
}

impl MetricsExporter<SystemClock> {
    pub fn new(state: Arc<RealtimeState<SystemClock>>, prefix: &str) -> Self {
        Self::with_clock(state, prefix, SystemClock)
    }
}

impl<C: Clock> MetricsExporter<C> {
    pub fn with_clock(state: Arc<RealtimeState<C>>, prefix: &str, clock: C) -> Self {
        Self {
            state,
            names: MetricNames::with_prefix(prefix),
            accum: Mutex::new(Accumulators::default()),
            clock,
        }
    }

    pub fn names(&self) -> &MetricNames {
        &self.names
    }

    /// One aggregation tick: drain the event ring and fold every event into
    /// the accumulators. The in-progress gauge restarts from zero each tick.
    pub fn aggregate(&self) {
        let events = self.state.drain_http_events();
        let now = self.clock.epoch_secs();

        let mut accum = self.accum.lock();
        accum.in_progress = IndexMap::new();

        for event in events {
            if event.agent_id.is_empty() {
                warn!("'agent_id' not found in http event for {} {}", event.method, event.path);
                continue;
            }
            let by_path =
                (event.agent_id.clone(), event.method.clone(), event.path.clone());

            *accum
                .total
                .entry((
                    event.agent_id.clone(),
                    event.method.clone(),
                    event.path.clone(),
                    event.status.to_string(),
                ))
                .or_default() += 1;
            *accum.by_worker.entry((event.agent_id.clone(), event.pid.clone())).or_default() += 1;
            *accum.duration_sum.entry(by_path.clone()).or_default() += event.duration;
            *accum.duration_count.entry(by_path.clone()).or_default() += 1;
            if event.time > 0.0 && now - event.time < IN_PROGRESS_WINDOW_SECS {
                *accum.in_progress.entry(by_path).or_default() += 1;
            }
        }
    }

    /// Build the metric families for one scrape.
    pub fn collect(&self) -> Vec<MetricFamily> {
        let mut families = self.request_families();
        families.extend(self.resource_families());
        families
    }

    /// Render the current families in exposition text format.
    pub fn render(&self) -> String {
        render::render(&self.collect())
    }

    fn request_families(&self) -> Vec<MetricFamily> {
        let accum = self.accum.lock();

        let mut total = MetricFamily::new(
            &self.names.requests_total,
            "Total number of HTTP requests",
            FamilyKind::Counter,
        );
        for ((agent_id, method, path, status), value) in &accum.total {
            total.push(Sample::labeled(
                [
                    ("agent_id", agent_id.clone()),
                    ("method", method.clone()),
                    ("path", path.clone()),
                    ("status", status.clone()),
                ],
                *value as f64,
            ));
        }

        let mut duration = MetricFamily::new(
            &self.names.requests_duration_seconds,
            "Request duration (seconds)",
            FamilyKind::Histogram,
        );
        for ((agent_id, method, path), count) in &accum.duration_count {
            let key = (agent_id.clone(), method.clone(), path.clone());
            let labels = [
                ("agent_id", agent_id.clone()),
                ("method", method.clone()),
                ("path", path.clone()),
            ];
            duration.push(Sample::named(
                &self.names.requests_duration_seconds_sum,
                labels.clone(),
                accum.duration_sum.get(&key).copied().unwrap_or_default(),
            ));
            duration.push(Sample::named(
                &self.names.requests_duration_seconds_count,
                labels,
                *count as f64,
            ));
        }

        let mut in_progress = MetricFamily::new(
            &self.names.requests_in_progress,
            "Number of in-progress HTTP requests",
            FamilyKind::Gauge,
        );
        for ((agent_id, method, path), value) in &accum.in_progress {
            in_progress.push(Sample::labeled(
                [
                    ("agent_id", agent_id.clone()),
                    ("method", method.clone()),
                    ("path", path.clone()),
                ],
                *value as f64,
            ));
        }

        let mut by_worker = MetricFamily::new(
            &self.names.requests_by_worker_total,
            "Total HTTP requests per worker",
            FamilyKind::Counter,
        );
        for ((agent_id, pid), value) in &accum.by_worker {
            by_worker.push(Sample::labeled(
                [("agent_id", agent_id.clone()), ("pid", pid.clone())],
                *value as f64,
            ));
        }

        vec![total, duration, in_progress, by_worker]
    }

    fn resource_families(&self) -> Vec<MetricFamily> {
        let now = self.clock.epoch_secs();
        let servers = self.state.all_servers();

        let mut cpu = MetricFamily::new(
            &self.names.worker_cpu_percent,
            "CPU usage (%) per worker",
            FamilyKind::Gauge,
        );
        let mut memory = MetricFamily::new(
            &self.names.worker_memory_bytes,
            "Memory usage in bytes",
            FamilyKind::Gauge,
        );
        let mut threads = MetricFamily::new(
            &self.names.worker_thread_count,
            "Thread count per worker",
            FamilyKind::Gauge,
        );
        let mut uptime = MetricFamily::new(
            &self.names.worker_uptime_seconds,
            "Worker uptime in seconds",
            FamilyKind::Gauge,
        );
        let mut master_uptime = MetricFamily::new(
            &self.names.master_uptime_seconds,
            "Uptime of master process",
            FamilyKind::Gauge,
        );
        let mut total_cpu = MetricFamily::new(
            &self.names.total_cpu_percent,
            "Total CPU usage (%) per agent",
            FamilyKind::Gauge,
        );
        let mut total_memory = MetricFamily::new(
            &self.names.total_memory_bytes,
            "Total memory usage (bytes) per agent",
            FamilyKind::Gauge,
        );
        let mut active_workers = MetricFamily::new(
            &self.names.active_worker_count,
            "Number of active workers",
            FamilyKind::Gauge,
        );

        for (agent_id, snapshot) in &servers {
            let mut agent_cpu = 0.0;
            let mut agent_memory = 0.0;
            for (pid, worker) in &snapshot.workers {
                let labels = [("agent_id", agent_id.clone()), ("pid", pid.clone())];
                cpu.push(Sample::labeled(labels.clone(), worker.cpu));
                memory.push(Sample::labeled(labels.clone(), worker.memory as f64));
                threads.push(Sample::labeled(labels.clone(), worker.num_threads as f64));
                uptime.push(Sample::labeled(labels, (now - worker.start_time).max(0.0)));
                agent_cpu += worker.cpu;
                agent_memory += worker.memory as f64;
            }

            if let Some(start_time) = snapshot.master_start_time() {
                master_uptime.push(Sample::labeled(
                    [("agent_id", agent_id.clone()), ("pid", snapshot.master_pid_label())],
                    (now - start_time).max(0.0),
                ));
            }

            if !snapshot.workers.is_empty() {
                let agent_label = [("agent_id", agent_id.clone())];
                total_cpu.push(Sample::labeled(agent_label.clone(), agent_cpu));
                total_memory.push(Sample::labeled(agent_label.clone(), agent_memory));
                active_workers
                    .push(Sample::labeled(agent_label, snapshot.workers.len() as f64));
            }
        }

        [cpu, memory, threads, uptime, master_uptime, total_cpu, total_memory, active_workers]
            .into_iter()
            .filter(|family| !family.samples.is_empty())
            .collect()
    }
}

#[cfg(test)]
#[path = "exporter_tests.rs"]
mod tests;
