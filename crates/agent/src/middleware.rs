// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tower middleware measuring one HTTP event per request.
//!
//! Per request: stamp the start time, ensure an `X-Request-Id` header, run
//! the inner service, mirror the request id onto the response, and push one
//! event through the metric sink. An inner error still produces an event
//! (status 500) and is then propagated unchanged.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::MatchedPath;
use http::header::{HeaderName, HeaderValue};
use http::{Request, Response};
use tower::{Layer, Service};
use uuid::Uuid;

use dashcorn_core::{agent_id, Clock, SystemClock};
use dashcorn_wire::{HttpEvent, Metric};

use crate::bootstrap;
use crate::config::AgentConfig;
use crate::publisher::MetricSink;

/// Request-id header, canonical on write, case-insensitive on read.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Request extension carrying the request id, readable from handlers.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

type NormalizePath = Arc<dyn Fn(&str) -> String + Send + Sync>;

struct Shared<C: Clock> {
    sink: Arc<dyn MetricSink>,
    agent_id: String,
    pid: u32,
    parent_pid: Option<u32>,
    enable_request_id: bool,
    normalize_path: Option<NormalizePath>,
    clock: C,
}

/// Layer installing the metrics interceptor.
pub struct MetricsLayer<C: Clock = SystemClock> {
    shared: Arc<Shared<C>>,
}

impl<C: Clock> Clone for MetricsLayer<C> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl MetricsLayer<SystemClock> {
    /// Boot (or join) the process-wide agent and measure through its
    /// publisher. The way an application installs dashcorn.
    pub fn new() -> Self {
        Self::with_config(None)
    }

    /// Same as [`new`](Self::new) with explicit configuration. The first
    /// caller's configuration wins process-wide.
    pub fn with_config(config: Option<AgentConfig>) -> Self {
        let agent = bootstrap::start(config);
        Self::with_sink(agent.sink())
    }

    /// Measure through an explicit sink without touching the process-wide
    /// agent.
    pub fn with_sink(sink: Arc<dyn MetricSink>) -> Self {
        Self::with_parts(sink, agent_id().to_string(), SystemClock)
    }
}

impl Default for MetricsLayer<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MetricsLayer<C> {
    pub fn with_parts(sink: Arc<dyn MetricSink>, agent_id: String, clock: C) -> Self {
        Self {
            shared: Arc::new(Shared {
                sink,
                agent_id,
                pid: std::process::id(),
                parent_pid: Some(std::os::unix::process::parent_id()),
                enable_request_id: true,
                normalize_path: None,
                clock,
            }),
        }
    }

    /// Toggle request-id injection (on by default).
    pub fn enable_request_id(self, enabled: bool) -> Self {
        self.map_shared(|shared| shared.enable_request_id = enabled)
    }

    /// Fallback path normalization, used when the router exposes no matched
    /// route template.
    pub fn normalize_path(self, normalize: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.map_shared(|shared| shared.normalize_path = Some(Arc::new(normalize)))
    }

    fn map_shared(self, apply: impl FnOnce(&mut Shared<C>)) -> Self {
        let mut shared = match Arc::try_unwrap(self.shared) {
            Ok(shared) => shared,
            Err(arc) => Shared {
                sink: Arc::clone(&arc.sink),
                agent_id: arc.agent_id.clone(),
                pid: arc.pid,
                parent_pid: arc.parent_pid,
                enable_request_id: arc.enable_request_id,
                normalize_path: arc.normalize_path.clone(),
                clock: arc.clock.clone(),
            },
        };
        apply(&mut shared);
        Self { shared: Arc::new(shared) }
    }
}

impl<S, C: Clock> Layer<S> for MetricsLayer<C> {
    type Service = MetricsService<S, C>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner, shared: Arc::clone(&self.shared) }
    }
}

/// The interceptor service produced by [`MetricsLayer`].
pub struct MetricsService<S, C: Clock = SystemClock> {
    inner: S,
    shared: Arc<Shared<C>>,
}

impl<S: Clone, C: Clock> Clone for MetricsService<S, C> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone(), shared: Arc::clone(&self.shared) }
    }
}

impl<S, C, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S, C>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
    C: Clock,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let shared = Arc::clone(&self.shared);
        let start = shared.clock.now();

        let request_id = if shared.enable_request_id {
            let id = req
                .headers()
                .get(&X_REQUEST_ID)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            if let Ok(value) = HeaderValue::from_str(&id) {
                req.headers_mut().insert(X_REQUEST_ID, value);
            }
            req.extensions_mut().insert(RequestId(id.clone()));
            Some(id)
        } else {
            None
        };

        let method = req.method().to_string();
        let matched_path =
            req.extensions().get::<MatchedPath>().map(|path| path.as_str().to_string());
        let raw_path = req.uri().path().to_string();

        let future = self.inner.call(req);
        Box::pin(async move {
            let mut result = future.await;
            let status = match &result {
                Ok(response) => response.status().as_u16(),
                // An inner failure reads as a synthesized 500; the error
                // itself is re-raised after the event goes out.
                Err(_) => 500,
            };

            if let (Ok(response), Some(id)) = (&mut result, &request_id) {
                if !response.headers().contains_key(&X_REQUEST_ID) {
                    if let Ok(value) = HeaderValue::from_str(id) {
                        response.headers_mut().insert(X_REQUEST_ID, value);
                    }
                }
            }

            let duration = shared.clock.now().duration_since(start).as_secs_f64();
            let path = match matched_path {
                Some(template) => template,
                None => match &shared.normalize_path {
                    Some(normalize) => normalize(&raw_path),
                    None => "?".to_string(),
                },
            };
            let event = HttpEvent {
                agent_id: shared.agent_id.clone(),
                method,
                path,
                status,
                duration,
                time: shared.clock.epoch_secs(),
                pid: shared.pid.to_string(),
                parent_pid: shared.parent_pid,
                request_id,
            };
            shared.sink.send(&Metric::Http(event)).await;

            result
        })
    }
}

#[cfg(test)]
#[path = "middleware_tests.rs"]
mod tests;
