// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP surfaces: the JSON snapshot API and the metrics-exposition endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{Json, Router};
use http::header::CONTENT_TYPE;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dashcorn_core::Clock;

use crate::exporter::MetricsExporter;
use crate::state::RealtimeState;

/// Exposition text content type.
pub const TEXT_FORMAT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

struct Running {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
    addr: SocketAddr,
}

/// Build the hub JSON API router: `/` status banner, `/metrics` snapshot.
pub fn hub_router<C: Clock>(state: Arc<RealtimeState<C>>) -> Router {
    Router::new()
        .route(
            "/",
            get(|| async { Json(serde_json::json!({"status": "Dashcorn dashboard running"})) }),
        )
        .route(
            "/metrics",
            get(move || {
                let state = Arc::clone(&state);
                async move { Json(state.snapshot()) }
            }),
        )
}

/// Background server for the hub JSON API.
pub struct HubApiServer<C: Clock> {
    state: Arc<RealtimeState<C>>,
    running: Mutex<Option<Running>>,
}

impl<C: Clock> HubApiServer<C> {
    pub fn new(state: Arc<RealtimeState<C>>) -> Self {
        Self { state, running: Mutex::new(None) }
    }

    pub async fn start(&self, host: &str, port: u16) -> std::io::Result<SocketAddr> {
        let router = hub_router(Arc::clone(&self.state));
        start_server(&self.running, router, host, port, "hub JSON API").await
    }

    pub async fn stop(&self) {
        stop_server(&self.running, "hub JSON API").await;
    }
}

/// Background server rendering the exposition text format.
pub struct ExpositionServer<C: Clock> {
    exporter: Arc<MetricsExporter<C>>,
    running: Mutex<Option<Running>>,
}

impl<C: Clock> ExpositionServer<C> {
    pub fn new(exporter: Arc<MetricsExporter<C>>) -> Self {
        Self { exporter, running: Mutex::new(None) }
    }

    pub async fn start(&self, host: &str, port: u16) -> std::io::Result<SocketAddr> {
        let render = {
            let exporter = Arc::clone(&self.exporter);
            move || {
                let exporter = Arc::clone(&exporter);
                async move { ([(CONTENT_TYPE, TEXT_FORMAT_CONTENT_TYPE)], exporter.render()) }
            }
        };
        let router = Router::new()
            .route("/", get(render.clone()))
            .route("/metrics", get(render));
        start_server(&self.running, router, host, port, "exposition server").await
    }

    pub async fn stop(&self) {
        stop_server(&self.running, "exposition server").await;
    }
}

async fn start_server(
    running: &Mutex<Option<Running>>,
    router: Router,
    host: &str,
    port: u16,
    what: &'static str,
) -> std::io::Result<SocketAddr> {
    {
        let guard = running.lock();
        if let Some(current) = guard.as_ref() {
            if !current.handle.is_finished() {
                debug!("{what} already running on {}", current.addr);
                return Ok(current.addr);
            }
        }
    }

    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    let addr = listener.local_addr()?;
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    let handle = tokio::spawn(async move {
        let serve = axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await });
        if let Err(err) = serve.await {
            warn!("{what} failed: {err}");
        }
    });
    *running.lock() = Some(Running { cancel, handle, addr });
    debug!("{what} listening on {addr}");
    Ok(addr)
}

async fn stop_server(running: &Mutex<Option<Running>>, what: &'static str) {
    let current = running.lock().take();
    let Some(current) = current else {
        return;
    };
    current.cancel.cancel();
    if tokio::time::timeout(STOP_JOIN_TIMEOUT, current.handle).await.is_err() {
        warn!("{what} did not stop within {STOP_JOIN_TIMEOUT:?}");
    }
    debug!("{what} stopped");
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
