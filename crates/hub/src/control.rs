// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control egress: publishes leader packets to every attached subscriber.
//!
//! Fan-out is best-effort with slow-joiner semantics: subscribers that
//! attach after a packet was published simply miss it, and the heartbeat
//! counter lets them reason about freshness. Dead subscribers are dropped at
//! the next publish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dashcorn_wire::{encode, write_message, BoundListener, Conn, ControlPacket, Endpoint, EndpointError};

const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

struct Running {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
    bound: Endpoint,
}

/// Publish side of the control channel.
pub struct ControlPublisher {
    delay_before_send: Duration,
    sent_once: AtomicBool,
    subscribers: Arc<tokio::sync::Mutex<Vec<Conn>>>,
    running: Mutex<Option<Running>>,
}

impl ControlPublisher {
    /// `delay_before_send` is slept once, before the very first publish, to
    /// give subscribers time to attach.
    pub fn new(delay_before_send: Duration) -> Self {
        Self {
            delay_before_send,
            sent_once: AtomicBool::new(false),
            subscribers: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            running: Mutex::new(None),
        }
    }

    /// Bind and start accepting subscribers. Returns the bound endpoint.
    /// A no-op when already running.
    pub async fn start(&self, endpoint: &Endpoint) -> Result<Endpoint, EndpointError> {
        {
            let running = self.running.lock();
            if let Some(running) = running.as_ref() {
                if !running.handle.is_finished() {
                    debug!("control publisher already running");
                    return Ok(running.bound.clone());
                }
            }
        }

        let listener = endpoint.bind().await?;
        let bound = listener.local_endpoint().unwrap_or_else(|| endpoint.clone());
        debug!("control publisher bound to {bound}");

        let cancel = CancellationToken::new();
        let subscribers = Arc::clone(&self.subscribers);
        let handle = tokio::spawn(accept_loop(listener, subscribers, cancel.clone()));
        *self.running.lock() = Some(Running { cancel, handle, bound: bound.clone() });
        Ok(bound)
    }

    /// Current number of attached subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Send one packet to every attached subscriber, dropping the dead ones.
    pub async fn publish(&self, packet: &ControlPacket) {
        if !self.sent_once.swap(true, Ordering::SeqCst) && !self.delay_before_send.is_zero() {
            tokio::time::sleep(self.delay_before_send).await;
        }
        let payload = match encode(packet) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("failed to encode control packet: {err}");
                return;
            }
        };

        let mut subscribers = self.subscribers.lock().await;
        let mut alive = Vec::with_capacity(subscribers.len());
        for mut conn in subscribers.drain(..) {
            match write_message(&mut conn, &payload).await {
                Ok(()) => alive.push(conn),
                Err(err) => debug!("dropping control subscriber: {err}"),
            }
        }
        *subscribers = alive;
        debug!("published control packet for {} (leader {})", packet.agent_id, packet.leader);
    }

    /// Stop accepting and disconnect every subscriber.
    pub async fn close(&self) {
        let running = self.running.lock().take();
        if let Some(running) = running {
            running.cancel.cancel();
            if tokio::time::timeout(STOP_JOIN_TIMEOUT, running.handle).await.is_err() {
                warn!("control publisher did not stop within {STOP_JOIN_TIMEOUT:?}");
            }
        }
        self.subscribers.lock().await.clear();
        debug!("control publisher closed");
    }
}

async fn accept_loop(
    listener: BoundListener,
    subscribers: Arc<tokio::sync::Mutex<Vec<Conn>>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            accepted = listener.accept() => match accepted {
                Ok(conn) => {
                    debug!("control subscriber attached");
                    subscribers.lock().await.push(conn);
                }
                Err(err) => {
                    warn!("accept error on control egress: {err}");
                    tokio::time::sleep(Duration::from_millis(500)).await;
                }
            },
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
