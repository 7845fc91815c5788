// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex as PlMutex;

use super::*;
use dashcorn_core::FakeClock;
use dashcorn_wire::ControlPacket;

struct RecordingSink {
    sent: PlMutex<Vec<Metric>>,
}

#[async_trait]
impl MetricSink for RecordingSink {
    async fn send(&self, metric: &Metric) {
        self.sent.lock().push(metric.clone());
    }
}

fn recording_sink() -> Arc<RecordingSink> {
    Arc::new(RecordingSink { sent: PlMutex::new(Vec::new()) })
}

async fn wait_for_reports(sink: &RecordingSink, at_least: usize) {
    for _ in 0..300 {
        if sink.sent.lock().len() >= at_least {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("reporter produced no output in time");
}

#[tokio::test]
async fn reports_carry_this_worker() {
    let settings = Arc::new(SettingsStore::with_parts("agent-a".into(), FakeClock::new()));
    let sink = recording_sink();
    let reporter =
        WorkerReporter::new(Duration::from_millis(50), settings, sink.clone() as Arc<dyn MetricSink>);
    reporter.start();
    wait_for_reports(&sink, 1).await;
    reporter.stop().await;

    let sent = sink.sent.lock();
    let Metric::WorkerStatus(status) = &sent[0] else {
        panic!("expected a worker status");
    };
    assert_eq!(status.agent_id, "agent-a");
    assert!(status.master.is_none());
    assert!(status.workers.contains_key(&std::process::id().to_string()));
}

#[tokio::test]
async fn heartbeat_from_settings_is_forwarded() {
    let settings = Arc::new(SettingsStore::with_parts("agent-a".into(), FakeClock::new()));
    settings.update(&ControlPacket { agent_id: "agent-a".into(), leader: 1, heartbeat: 6 });

    let sink = recording_sink();
    let reporter =
        WorkerReporter::new(Duration::from_millis(50), settings, sink.clone() as Arc<dyn MetricSink>);
    reporter.start();
    wait_for_reports(&sink, 1).await;
    reporter.stop().await;

    let sent = sink.sent.lock();
    let Metric::WorkerStatus(status) = &sent[0] else {
        panic!("expected a worker status");
    };
    assert_eq!(status.heartbeat, Some(6));
    // Leader pid 1 is not this process, so no master sample.
    assert!(status.master.is_none());
}

#[tokio::test]
async fn stop_halts_the_loop() {
    let settings = Arc::new(SettingsStore::with_parts("agent-a".into(), FakeClock::new()));
    let sink = recording_sink();
    let reporter =
        WorkerReporter::new(Duration::from_millis(30), settings, sink.clone() as Arc<dyn MetricSink>);
    reporter.start();
    wait_for_reports(&sink, 1).await;
    reporter.stop().await;

    let count = sink.sent.lock().len();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(sink.sent.lock().len(), count);

    // Stopping again is a no-op.
    reporter.stop().await;
}
