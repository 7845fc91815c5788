// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic worker-status reporting.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dashcorn_core::{proc, Clock, SystemClock};
use dashcorn_wire::{Metric, WorkerStatus};

use crate::publisher::MetricSink;
use crate::settings::SettingsStore;

const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

struct Running {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Sends one worker-status message per interval tick. When this worker is
/// the elected leader, the message additionally carries the master process.
pub struct WorkerReporter<C: Clock = SystemClock> {
    interval: Duration,
    settings: Arc<SettingsStore<C>>,
    sink: Arc<dyn MetricSink>,
    running: Mutex<Option<Running>>,
}

impl<C: Clock> WorkerReporter<C> {
    pub fn new(
        interval: Duration,
        settings: Arc<SettingsStore<C>>,
        sink: Arc<dyn MetricSink>,
    ) -> Self {
        Self { interval, settings, sink, running: Mutex::new(None) }
    }

    /// Start the reporting loop. A no-op when already running.
    pub fn start(&self) {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("worker reporter already running");
            return;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.interval,
            Arc::clone(&self.settings),
            Arc::clone(&self.sink),
            cancel.clone(),
        ));
        *running = Some(Running { cancel, handle });
        debug!("worker reporter started (interval {:?})", self.interval);
    }

    /// Stop the reporting loop with a bounded join. A no-op when stopped.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(running) = running else {
            return;
        };
        running.cancel.cancel();
        if tokio::time::timeout(STOP_JOIN_TIMEOUT, running.handle).await.is_err() {
            warn!("worker reporter did not stop within {STOP_JOIN_TIMEOUT:?}");
        }
        debug!("worker reporter stopped");
    }

    pub async fn restart(&self) {
        self.stop().await;
        self.start();
    }
}

async fn run_loop<C: Clock>(
    interval: Duration,
    settings: Arc<SettingsStore<C>>,
    sink: Arc<dyn MetricSink>,
    cancel: CancellationToken,
) {
    let clock = SystemClock;
    loop {
        report_once(&settings, sink.as_ref(), &clock).await;
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

async fn report_once<C: Clock>(
    settings: &SettingsStore<C>,
    sink: &dyn MetricSink,
    clock: &SystemClock,
) {
    let leader = settings.leader();
    let heartbeat = settings.heartbeat();
    // The CPU sampling window blocks, so inspection runs off the runtime.
    let sampled = tokio::task::spawn_blocking(move || proc::worker_metrics(leader, heartbeat)).await;
    match sampled {
        Ok(Ok(metrics)) => {
            let status = WorkerStatus {
                agent_id: settings.agent_id().to_string(),
                time: clock.epoch_secs(),
                master: metrics.master,
                workers: metrics.workers,
                heartbeat,
            };
            sink.send(&Metric::WorkerStatus(status)).await;
        }
        Ok(Err(err)) => warn!("failed to inspect worker process: {err}"),
        Err(err) => warn!("worker inspection task failed: {err}"),
    }
}

#[cfg(test)]
#[path = "reporter_tests.rs"]
mod tests;
