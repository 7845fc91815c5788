// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic aggregation driver.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dashcorn_core::Clock;

use super::MetricsExporter;

const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

struct Running {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Runs [`MetricsExporter::aggregate`] every interval.
pub struct ExportScheduler<C: Clock> {
    interval: Duration,
    exporter: Arc<MetricsExporter<C>>,
    running: Mutex<Option<Running>>,
}

impl<C: Clock> ExportScheduler<C> {
    pub fn new(interval: Duration, exporter: Arc<MetricsExporter<C>>) -> Self {
        Self { interval, exporter, running: Mutex::new(None) }
    }

    /// Start the aggregation loop. A no-op when already running.
    pub fn start(&self) {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("export scheduler already running");
            return;
        }
        let cancel = CancellationToken::new();
        let exporter = Arc::clone(&self.exporter);
        let interval = self.interval;
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                exporter.aggregate();
                tokio::select! {
                    _ = task_cancel.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        });
        *running = Some(Running { cancel, handle });
        debug!("export scheduler started (interval {:?})", self.interval);
    }

    /// Stop the aggregation loop with a bounded join.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(running) = running else {
            return;
        };
        running.cancel.cancel();
        if tokio::time::timeout(STOP_JOIN_TIMEOUT, running.handle).await.is_err() {
            warn!("export scheduler did not stop within {STOP_JOIN_TIMEOUT:?}");
        }
        debug!("export scheduler stopped");
    }
}
