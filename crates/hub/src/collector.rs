// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics ingestion: the hub's pull side.
//!
//! Binding errors are fatal at start time. Once running, per-message
//! failures only cost that message, and repeated transport errors back off
//! briefly instead of spinning.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dashcorn_core::Clock;
use dashcorn_wire::{read_message, BoundListener, Conn, Endpoint, EndpointError, Metric};

use crate::state::RealtimeState;

const ERROR_BACKOFF: Duration = Duration::from_millis(500);
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

struct Running {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
    bound: Endpoint,
}

/// Accepts agent push connections and feeds decoded messages into the state.
pub struct MetricsCollector<C: Clock> {
    state: Arc<RealtimeState<C>>,
    running: Mutex<Option<Running>>,
}

impl<C: Clock> MetricsCollector<C> {
    pub fn new(state: Arc<RealtimeState<C>>) -> Self {
        Self { state, running: Mutex::new(None) }
    }

    /// Bind and start the ingestion loop. Returns the bound endpoint (useful
    /// with an ephemeral port). A no-op when already running.
    pub async fn start(&self, endpoint: &Endpoint) -> Result<Endpoint, EndpointError> {
        {
            let running = self.running.lock();
            if let Some(running) = running.as_ref() {
                if !running.handle.is_finished() {
                    debug!("metrics collector already running");
                    return Ok(running.bound.clone());
                }
            }
        }

        let listener = endpoint.bind().await?;
        let bound = listener.local_endpoint().unwrap_or_else(|| endpoint.clone());
        debug!("metrics collector listening on {bound}");

        let cancel = CancellationToken::new();
        let state = Arc::clone(&self.state);
        let handle = tokio::spawn(accept_loop(listener, state, cancel.clone()));
        *self.running.lock() = Some(Running { cancel, handle, bound: bound.clone() });
        Ok(bound)
    }

    /// Stop the ingestion loop with a bounded join. A no-op when stopped.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(running) = running else {
            return;
        };
        running.cancel.cancel();
        if tokio::time::timeout(STOP_JOIN_TIMEOUT, running.handle).await.is_err() {
            warn!("metrics collector did not stop within {STOP_JOIN_TIMEOUT:?}");
        }
        debug!("metrics collector stopped");
    }
}

async fn accept_loop<C: Clock>(
    listener: BoundListener,
    state: Arc<RealtimeState<C>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            accepted = listener.accept() => match accepted {
                Ok(conn) => {
                    let state = Arc::clone(&state);
                    let cancel = cancel.clone();
                    tokio::spawn(handle_conn(conn, state, cancel));
                }
                Err(err) => {
                    warn!("accept error on metrics ingress: {err}");
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            },
        }
    }
}

async fn handle_conn<C: Clock>(
    mut conn: Conn,
    state: Arc<RealtimeState<C>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            result = read_message(&mut conn) => match result {
                Ok(payload) => dispatch(&state, &payload),
                Err(err) if err.is_closed() => {
                    debug!("metrics connection closed");
                    return;
                }
                Err(err) => {
                    warn!("error while receiving metrics: {err}");
                    tokio::time::sleep(ERROR_BACKOFF).await;
                    return;
                }
            },
        }
    }
}

fn dispatch<C: Clock>(state: &RealtimeState<C>, payload: &[u8]) {
    let value: serde_json::Value = match serde_json::from_slice(payload) {
        Ok(value) => value,
        Err(err) => {
            warn!("malformed metrics message: {err}");
            return;
        }
    };
    let message_type =
        value.get("type").and_then(serde_json::Value::as_str).unwrap_or("").to_string();
    match serde_json::from_value::<Metric>(value) {
        Ok(metric) => state.apply(metric),
        Err(err) => warn!("unknown message type {message_type:?}: {err}"),
    }
}

#[cfg(test)]
#[path = "collector_tests.rs"]
mod tests;
