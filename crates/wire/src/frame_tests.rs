// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format tests: length-prefix framing and JSON encoding.

use super::*;
use crate::message::ControlPacket;

#[test]
fn encode_returns_json_without_length_prefix() {
    let packet = ControlPacket { agent_id: "A".into(), leader: 10, heartbeat: 0 };
    let encoded = encode(&packet).expect("encode failed");

    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(json_str.starts_with('{'), "should be JSON object: {}", json_str);
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original).await.expect("write failed");

    // write_message adds 4-byte length prefix
    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");

    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn clean_eof_reads_as_closed() {
    let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(err.is_closed());
}

#[tokio::test]
async fn truncated_frame_is_an_io_error() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, b"full frame").await.unwrap();
    buffer.truncate(buffer.len() - 3);

    let mut cursor = std::io::Cursor::new(buffer);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Io(_)));
}

#[tokio::test]
async fn oversized_length_prefix_is_rejected() {
    let mut buffer = ((MAX_MESSAGE_SIZE + 1) as u32).to_be_bytes().to_vec();
    buffer.extend_from_slice(b"ignored");

    let mut cursor = std::io::Cursor::new(buffer);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::TooLarge(_)));
}

#[tokio::test]
async fn json_helpers_roundtrip() {
    let packet = ControlPacket { agent_id: "A".into(), leader: 30, heartbeat: 7 };

    let mut buffer = Vec::new();
    write_json(&mut buffer, &packet).await.expect("write failed");

    let mut cursor = std::io::Cursor::new(buffer);
    let back: ControlPacket = read_json(&mut cursor).await.expect("read failed");
    assert_eq!(back, packet);
}
