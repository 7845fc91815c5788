// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between agents, the hub, and the operator CLI.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload, over TCP
//! or Unix-domain streams.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod endpoint;
mod frame;
mod message;
mod supervisor;

pub use endpoint::{refresh_ipc_socket, BoundListener, Conn, Endpoint, EndpointError};
pub use frame::{
    decode, encode, read_json, read_message, write_json, write_message, ProtocolError,
    MAX_MESSAGE_SIZE,
};
pub use message::{ControlPacket, HttpEvent, Metric, ProcInfo, WorkerStatus};
pub use supervisor::{
    Command, ProcRecord, ProcessEntry, Reply, ReplyStatus, RunStatus, StartArgs,
    DEFAULT_PM_SOCKET,
};
