// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leader-election loop.
//!
//! Periodically rotates the leader worker of every live agent and broadcasts
//! the assignments. An agent with no live workers is skipped for that round.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dashcorn_core::Clock;

use crate::control::ControlPublisher;
use crate::state::RealtimeState;

const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

struct Running {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Drives [`RealtimeState::elect_leaders`] on an interval and publishes the
/// resulting packets.
pub struct LeaderSelector<C: Clock> {
    interval: Duration,
    state: Arc<RealtimeState<C>>,
    publisher: Arc<ControlPublisher>,
    running: Mutex<Option<Running>>,
}

impl<C: Clock> LeaderSelector<C> {
    pub fn new(
        interval: Duration,
        state: Arc<RealtimeState<C>>,
        publisher: Arc<ControlPublisher>,
    ) -> Self {
        Self { interval, state, publisher, running: Mutex::new(None) }
    }

    /// Start the election loop. A no-op when already running.
    pub fn start(&self) {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("leader selector already running");
            return;
        }
        let cancel = CancellationToken::new();
        let state = Arc::clone(&self.state);
        let publisher = Arc::clone(&self.publisher);
        let interval = self.interval;
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                for packet in state.elect_leaders() {
                    publisher.publish(&packet).await;
                }
                tokio::select! {
                    _ = task_cancel.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        });
        *running = Some(Running { cancel, handle });
        debug!("leader selector started (interval {:?})", self.interval);
    }

    /// Stop the election loop with a bounded join. A no-op when stopped.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(running) = running else {
            return;
        };
        running.cancel.cancel();
        if tokio::time::timeout(STOP_JOIN_TIMEOUT, running.handle).await.is_err() {
            warn!("leader selector did not stop within {STOP_JOIN_TIMEOUT:?}");
        }
        debug!("leader selector stopped");
    }

    pub async fn restart(&self) {
        self.stop().await;
        self.start();
    }
}

#[cfg(test)]
#[path = "selector_tests.rs"]
mod tests;
