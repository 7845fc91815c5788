// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;
use dashcorn_wire::{write_json, HttpEvent, Metric};

fn test_config(dir: &tempfile::TempDir) -> HubConfig {
    HubConfig {
        metrics_endpoint: Endpoint::Tcp { host: "127.0.0.1".into(), port: 0 },
        control_endpoint: Endpoint::Tcp { host: "127.0.0.1".into(), port: 0 },
        pm_endpoint: Endpoint::Ipc { path: dir.path().join("pm.sock") },
        use_curve_auth: false,
        cert_dir: None,
        leader_rotate_interval: Duration::from_millis(50),
        aggregate_interval: Duration::from_millis(50),
        publish_delay: Duration::ZERO,
        hub_host: "127.0.0.1".into(),
        hub_port: 0,
        prom_host: "127.0.0.1".into(),
        prom_port: 0,
        metric_prefix: "uvicorn".into(),
        enable_logging: false,
    }
}

fn service(dir: &tempfile::TempDir) -> HubService {
    HubService::with_parts(
        test_config(dir),
        dir.path().join("running.json"),
        dashcorn_core::SystemClock,
    )
    .unwrap()
}

#[tokio::test]
async fn started_hub_ingests_and_exposes() {
    let dir = tempfile::tempdir().unwrap();
    let service = service(&dir);
    let bound = service.start().await.unwrap();

    let mut conn = bound.metrics.connect().await.unwrap();
    write_json(
        &mut conn,
        &Metric::Http(HttpEvent {
            agent_id: "A".into(),
            method: "GET".into(),
            path: "/x".into(),
            status: 200,
            duration: 0.1,
            time: 1.0,
            pid: "10".into(),
            parent_pid: None,
            request_id: None,
        }),
    )
    .await
    .unwrap();

    // Wait for ingestion and an aggregation tick to fold the event in
    for _ in 0..200 {
        if service.exporter().render().contains("uvicorn_requests_total{") {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(service
        .exporter()
        .render()
        .contains("uvicorn_requests_total{agent_id=\"A\",method=\"GET\",path=\"/x\",status=\"200\"} 1"));

    service.stop().await;
    assert!(service.bound_endpoints().is_none());
}

#[tokio::test]
async fn a_live_pid_file_owner_blocks_startup() {
    let dir = tempfile::tempdir().unwrap();
    let pid_file = PidFile::new(dir.path().join("hub.pid"));
    pid_file.write().unwrap(); // our own pid: alive by definition

    let service = service(&dir).self_managed(PidFile::new(dir.path().join("hub.pid")));
    let err = service.start().await.unwrap_err();
    assert!(matches!(err, LifecycleError::AlreadyRunning(_)));
}

#[tokio::test]
async fn pid_file_is_written_on_start_and_removed_on_stop() {
    let dir = tempfile::tempdir().unwrap();
    let pid_path = dir.path().join("hub.pid");

    let service = service(&dir).self_managed(PidFile::new(pid_path.clone()));
    service.start().await.unwrap();
    assert_eq!(PidFile::new(pid_path.clone()).read(), Some(std::process::id()));

    service.stop().await;
    assert!(!pid_path.exists());
}

#[tokio::test]
async fn hooks_run_in_lifecycle_order() {
    let dir = tempfile::tempdir().unwrap();
    let startups = std::sync::Arc::new(AtomicUsize::new(0));
    let shutdowns = std::sync::Arc::new(AtomicUsize::new(0));

    let on_start = std::sync::Arc::clone(&startups);
    let on_stop = std::sync::Arc::clone(&shutdowns);
    let service = service(&dir)
        .on_startup(move || {
            on_start.fetch_add(1, Ordering::SeqCst);
        })
        .on_shutdown(move || {
            on_stop.fetch_add(1, Ordering::SeqCst);
        });

    service.start().await.unwrap();
    assert_eq!((startups.load(Ordering::SeqCst), shutdowns.load(Ordering::SeqCst)), (1, 0));
    service.stop().await;
    assert_eq!((startups.load(Ordering::SeqCst), shutdowns.load(Ordering::SeqCst)), (1, 1));
}

#[tokio::test]
async fn corrupt_registry_fails_startup_assembly() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("running.json"), b"{ nope").unwrap();
    let err = HubService::with_parts(
        test_config(&dir),
        dir.path().join("running.json"),
        dashcorn_core::SystemClock,
    )
    .err()
    .unwrap();
    assert!(matches!(err, LifecycleError::Registry(_)));
}
