// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::BTreeMap;

use super::*;
use crate::exporter::MetricsExporter;
use crate::state::StateConfig;
use axum::body::Body;
use dashcorn_core::SystemClock;
use dashcorn_wire::{HttpEvent, ProcInfo, WorkerStatus};
use http::Request;
use http_body_util::BodyExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

fn seeded_state() -> Arc<RealtimeState<SystemClock>> {
    let state = Arc::new(RealtimeState::new(StateConfig::default()));
    state.record_http(HttpEvent {
        agent_id: "A".into(),
        method: "GET".into(),
        path: "/x".into(),
        status: 200,
        duration: 0.1,
        time: 1.0,
        pid: "10".into(),
        parent_pid: None,
        request_id: None,
    });
    state.record_server(WorkerStatus {
        agent_id: "A".into(),
        time: 1.0,
        master: None,
        workers: BTreeMap::from([(
            "10".to_string(),
            ProcInfo {
                pid: 10,
                parent_pid: Some(1),
                name: "uvicorn".into(),
                cmdline: vec![],
                cpu: 1.0,
                memory: 100,
                start_time: 1.0,
                num_threads: 1,
                heartbeat: None,
            },
        )]),
        heartbeat: None,
    });
    state
}

/// Minimal HTTP/1.1 GET against a live server socket.
async fn raw_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nhost: {addr}\r\nconnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn root_serves_the_status_banner() {
    let router = hub_router(seeded_state());
    let response =
        router.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), 200);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["status"], "Dashcorn dashboard running");
}

#[tokio::test]
async fn metrics_serves_the_state_snapshot() {
    let router = hub_router(seeded_state());
    let response = router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["http"][0]["path"], "/x");
    assert_eq!(value["server"]["A"]["workers"]["10"]["pid"], 10);
}

#[tokio::test]
async fn hub_api_server_start_stop_cycle() {
    let server = HubApiServer::new(seeded_state());
    let addr = server.start("127.0.0.1", 0).await.unwrap();
    let again = server.start("127.0.0.1", 0).await.unwrap();
    assert_eq!(addr, again);

    let response = raw_get(addr, "/").await;
    assert!(response.contains("Dashcorn dashboard running"));

    server.stop().await;
    server.stop().await;
}

#[tokio::test]
async fn exposition_server_renders_text_format() {
    let state = seeded_state();
    let exporter = Arc::new(MetricsExporter::new(Arc::clone(&state), "uvicorn"));
    exporter.aggregate();

    let server = ExpositionServer::new(exporter);
    let addr = server.start("127.0.0.1", 0).await.unwrap();

    let response = raw_get(addr, "/metrics").await;
    assert!(response.contains("text/plain; version=0.0.4"));
    assert!(response.contains("# TYPE uvicorn_requests_total counter"));
    assert!(response.contains(
        "uvicorn_requests_total{agent_id=\"A\",method=\"GET\",path=\"/x\",status=\"200\"} 1"
    ));

    server.stop().await;
}
