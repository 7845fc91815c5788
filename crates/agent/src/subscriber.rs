// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-channel subscriber.
//!
//! A background task connects to the hub's publish side, decodes control
//! packets, and hands them to the configured handler. Loss of the connection
//! is normal (slow-joiner semantics): the task redials until stopped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dashcorn_wire::{decode, read_message, ControlPacket, Endpoint};

const RECONNECT_DELAY: Duration = Duration::from_millis(500);
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

type PacketHandler = Arc<dyn Fn(ControlPacket) + Send + Sync>;

struct Running {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Subscribes to the hub's control channel and dispatches packets.
pub struct SettingsSubscriber {
    endpoint: Endpoint,
    handler: PacketHandler,
    running: Mutex<Option<Running>>,
}

impl SettingsSubscriber {
    pub fn new(endpoint: Endpoint, handler: impl Fn(ControlPacket) + Send + Sync + 'static) -> Self {
        Self { endpoint, handler: Arc::new(handler), running: Mutex::new(None) }
    }

    /// Start the background loop. A no-op when already running.
    pub fn start(&self) {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            debug!("settings subscriber already running");
            return;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_loop(
            self.endpoint.clone(),
            Arc::clone(&self.handler),
            cancel.clone(),
        ));
        *running = Some(Running { cancel, handle });
        debug!("settings subscriber started on {}", self.endpoint);
    }

    /// Stop the background loop and join it with a bounded wait. A no-op
    /// when not running.
    pub async fn stop(&self) {
        let running = self.running.lock().take();
        let Some(running) = running else {
            return;
        };
        running.cancel.cancel();
        if tokio::time::timeout(STOP_JOIN_TIMEOUT, running.handle).await.is_err() {
            warn!("settings subscriber did not stop within {STOP_JOIN_TIMEOUT:?}");
        }
        debug!("settings subscriber stopped");
    }

    pub async fn restart(&self) {
        self.stop().await;
        self.start();
    }
}

async fn run_loop(endpoint: Endpoint, handler: PacketHandler, cancel: CancellationToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        match endpoint.connect().await {
            Ok(mut conn) => {
                debug!("subscribed to control channel at {endpoint}");
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        result = read_message(&mut conn) => match result {
                            Ok(payload) => match decode::<ControlPacket>(&payload) {
                                Ok(packet) => handler(packet),
                                Err(err) => warn!("malformed control packet: {err}"),
                            },
                            Err(err) if err.is_closed() => {
                                debug!("control channel closed");
                                break;
                            }
                            Err(err) => {
                                warn!("control channel receive error: {err}");
                                break;
                            }
                        },
                    }
                }
            }
            Err(err) => {
                debug!("control endpoint {endpoint} unavailable: {err}");
            }
        }
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
}

#[cfg(test)]
#[path = "subscriber_tests.rs"]
mod tests;
