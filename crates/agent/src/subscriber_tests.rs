// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use super::*;
use dashcorn_wire::write_json;
use parking_lot::Mutex as PlMutex;

fn recording_handler() -> (Arc<PlMutex<Vec<ControlPacket>>>, impl Fn(ControlPacket) + Send + Sync) {
    let seen = Arc::new(PlMutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |packet| sink.lock().push(packet))
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn receives_published_packets() {
    let listener = Endpoint::new("tcp", "127.0.0.1:0").unwrap().bind().await.unwrap();
    let bound = listener.local_endpoint().unwrap();

    let (seen, handler) = recording_handler();
    let subscriber = SettingsSubscriber::new(bound, handler);
    subscriber.start();

    let mut conn = listener.accept().await.unwrap();
    let packet = ControlPacket { agent_id: "A".into(), leader: 10, heartbeat: 0 };
    write_json(&mut conn, &packet).await.unwrap();

    wait_until(|| !seen.lock().is_empty()).await;
    assert_eq!(seen.lock()[0], packet);
    subscriber.stop().await;
}

#[tokio::test]
async fn malformed_packets_are_dropped_and_the_loop_continues() {
    let listener = Endpoint::new("tcp", "127.0.0.1:0").unwrap().bind().await.unwrap();
    let bound = listener.local_endpoint().unwrap();

    let (seen, handler) = recording_handler();
    let subscriber = SettingsSubscriber::new(bound, handler);
    subscriber.start();

    let mut conn = listener.accept().await.unwrap();
    dashcorn_wire::write_message(&mut conn, b"{\"not\":\"a packet\"}").await.unwrap();
    let packet = ControlPacket { agent_id: "A".into(), leader: 20, heartbeat: 1 };
    write_json(&mut conn, &packet).await.unwrap();

    wait_until(|| !seen.lock().is_empty()).await;
    assert_eq!(seen.lock().as_slice(), &[packet]);
    subscriber.stop().await;
}

#[tokio::test]
async fn reconnects_after_the_publisher_drops_the_connection() {
    let listener = Endpoint::new("tcp", "127.0.0.1:0").unwrap().bind().await.unwrap();
    let bound = listener.local_endpoint().unwrap();

    let (seen, handler) = recording_handler();
    let subscriber = SettingsSubscriber::new(bound, handler);
    subscriber.start();

    let first = ControlPacket { agent_id: "A".into(), leader: 10, heartbeat: 0 };
    let mut conn = listener.accept().await.unwrap();
    write_json(&mut conn, &first).await.unwrap();
    wait_until(|| seen.lock().len() == 1).await;
    drop(conn);

    // The subscriber redials; the second connection delivers another packet.
    let second = ControlPacket { agent_id: "A".into(), leader: 20, heartbeat: 1 };
    let mut conn = listener.accept().await.unwrap();
    write_json(&mut conn, &second).await.unwrap();
    wait_until(|| seen.lock().len() == 2).await;

    assert_eq!(seen.lock().as_slice(), &[first, second]);
    subscriber.stop().await;
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let listener = Endpoint::new("tcp", "127.0.0.1:0").unwrap().bind().await.unwrap();
    let bound = listener.local_endpoint().unwrap();

    let (_seen, handler) = recording_handler();
    let subscriber = SettingsSubscriber::new(bound, handler);
    subscriber.start();
    subscriber.start();
    subscriber.stop().await;
    subscriber.stop().await;
    subscriber.restart().await;
    subscriber.stop().await;
}
