// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound metrics push.
//!
//! The publisher is the one place agent telemetry touches the network, and
//! it must never fail the caller: connect and send errors are logged at warn
//! level and swallowed. A broken stream is dropped and redialed on the next
//! send.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use dashcorn_wire::{encode, write_message, Conn, Endpoint, Metric};

/// Where finished metrics go. The interceptor and reporter only know this
/// seam, so tests substitute recording or failing sinks.
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn send(&self, metric: &Metric);
}

/// Fire-and-forget push connection to the hub's metrics ingress.
pub struct MetricsPublisher {
    endpoint: Endpoint,
    conn: tokio::sync::Mutex<Option<Conn>>,
}

impl MetricsPublisher {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint, conn: tokio::sync::Mutex::new(None) }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Release the connection. Subsequent sends would redial.
    pub async fn close(&self) {
        let mut conn = self.conn.lock().await;
        if let Some(mut stream) = conn.take() {
            let _ = stream.shutdown().await;
            debug!("metrics publisher closed");
        }
    }
}

#[async_trait]
impl MetricSink for MetricsPublisher {
    async fn send(&self, metric: &Metric) {
        let payload = match encode(metric) {
            Ok(payload) => payload,
            Err(err) => {
                warn!("failed to encode metric: {err}");
                return;
            }
        };

        let mut conn = self.conn.lock().await;
        if conn.is_none() {
            match self.endpoint.connect().await {
                Ok(stream) => {
                    debug!("connected to metrics ingress at {}", self.endpoint);
                    *conn = Some(stream);
                }
                Err(err) => {
                    warn!("failed to connect to {}: {err}", self.endpoint);
                    return;
                }
            }
        }
        if let Some(stream) = conn.as_mut() {
            if let Err(err) = write_message(stream, &payload).await {
                warn!("failed to send metric: {err}");
                *conn = None;
            }
        }
    }
}

#[cfg(test)]
#[path = "publisher_tests.rs"]
mod tests;
