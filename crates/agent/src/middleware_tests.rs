// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::routing::get;
use axum::{Extension, Router};
use http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use parking_lot::Mutex as PlMutex;
use tower::{service_fn, Layer, ServiceExt};

use super::*;
use dashcorn_wire::Metric;

#[derive(Default)]
struct RecordingSink {
    sent: PlMutex<Vec<Metric>>,
    attempts: AtomicUsize,
}

#[async_trait]
impl MetricSink for RecordingSink {
    async fn send(&self, metric: &Metric) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().push(metric.clone());
    }
}

impl RecordingSink {
    fn last_event(&self) -> HttpEvent {
        let sent = self.sent.lock();
        let Some(Metric::Http(event)) = sent.last().cloned() else {
            panic!("no http event recorded");
        };
        event
    }
}

fn layer_with(sink: &Arc<RecordingSink>) -> MetricsLayer {
    MetricsLayer::with_parts(
        Arc::clone(sink) as Arc<dyn MetricSink>,
        "agent-test".to_string(),
        SystemClock,
    )
}

fn test_router(sink: &Arc<RecordingSink>) -> Router {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route(
            "/users/{id}",
            get(|Extension(RequestId(id)): Extension<RequestId>| async move { id }),
        )
        .layer(layer_with(sink))
}

#[tokio::test]
async fn inbound_request_id_is_preserved_end_to_end() {
    let sink = Arc::new(RecordingSink::default());
    let router = test_router(&sink);

    let request = Request::builder()
        .uri("/users/7")
        .header("X-ReQuEsT-iD", "fixed-id-123")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get(&X_REQUEST_ID).unwrap(), "fixed-id-123");

    // The handler saw the id through the request extension
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"fixed-id-123");

    let event = sink.last_event();
    assert_eq!(event.request_id.as_deref(), Some("fixed-id-123"));
}

#[tokio::test]
async fn a_fresh_request_id_is_generated_when_absent() {
    let sink = Arc::new(RecordingSink::default());
    let router = test_router(&sink);

    let response = router
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let header = response.headers().get(&X_REQUEST_ID).unwrap().to_str().unwrap().to_string();
    // UUID v4 text form
    assert_eq!(header.len(), 36);

    let event = sink.last_event();
    assert_eq!(event.request_id.as_deref(), Some(header.as_str()));
}

#[tokio::test]
async fn the_matched_route_template_becomes_the_path() {
    let sink = Arc::new(RecordingSink::default());
    let router = test_router(&sink);

    let request = Request::builder().uri("/users/42").body(Body::empty()).unwrap();
    router.oneshot(request).await.unwrap();

    let event = sink.last_event();
    assert_eq!(event.path, "/users/{id}");
    assert_eq!(event.method, "GET");
    assert_eq!(event.status, 200);
    assert!(event.duration >= 0.0);
    assert_eq!(event.agent_id, "agent-test");
}

#[tokio::test]
async fn normalize_callback_applies_without_a_route_template() {
    let sink = Arc::new(RecordingSink::default());
    let layer = layer_with(&sink).normalize_path(|path| path.replace("123", ":id"));
    let mut service = layer.layer(service_fn(|_req: Request<Body>| async {
        Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
    }));

    let request = Request::builder().uri("/orders/123").body(Body::empty()).unwrap();
    service.ready().await.unwrap().call(request).await.unwrap();

    assert_eq!(sink.last_event().path, "/orders/:id");
}

#[tokio::test]
async fn without_template_or_callback_the_path_is_a_question_mark() {
    let sink = Arc::new(RecordingSink::default());
    let mut service = layer_with(&sink).layer(service_fn(|_req: Request<Body>| async {
        Ok::<_, std::convert::Infallible>(Response::new(Body::empty()))
    }));

    let request = Request::builder().uri("/whatever/raw").body(Body::empty()).unwrap();
    service.ready().await.unwrap().call(request).await.unwrap();

    assert_eq!(sink.last_event().path, "?");
}

#[tokio::test]
async fn telemetry_is_transparent_to_the_response() {
    // A sink whose transport always fails still swallows; the request path
    // must see the downstream response untouched.
    let sink = Arc::new(RecordingSink::default());
    let router = test_router(&sink);

    let response = router
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"pong");
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn inner_errors_still_emit_a_500_event_and_re_raise() {
    let sink = Arc::new(RecordingSink::default());
    let mut service = layer_with(&sink).layer(service_fn(|_req: Request<Body>| async {
        Err::<Response<Body>, _>("downstream exploded")
    }));

    let request = Request::builder().uri("/boom").body(Body::empty()).unwrap();
    let err = service.ready().await.unwrap().call(request).await.unwrap_err();

    assert_eq!(err, "downstream exploded");
    let event = sink.last_event();
    assert_eq!(event.status, 500);
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn request_id_injection_can_be_disabled() {
    let sink = Arc::new(RecordingSink::default());
    let layer = layer_with(&sink).enable_request_id(false);
    let router = Router::new().route("/ping", get(|| async { "pong" })).layer(layer);

    let response = router
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.headers().get(&X_REQUEST_ID).is_none());
    assert_eq!(sink.last_event().request_id, None);
}
