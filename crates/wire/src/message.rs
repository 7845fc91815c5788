// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Telemetry and control messages.
//!
//! Every message is a newline-free UTF-8 JSON object; telemetry messages
//! carry a `type` discriminator. Decoding is liberal where foreign senders
//! are known to vary (`pid` and `status` arrive as strings or numbers).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub use dashcorn_core::ProcInfo;

/// One finished HTTP request, as emitted by the interceptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpEvent {
    #[serde(default)]
    pub agent_id: String,
    #[serde(default = "unknown")]
    pub method: String,
    #[serde(default = "unknown")]
    pub path: String,
    #[serde(default, deserialize_with = "status_lenient")]
    pub status: u16,
    /// Request duration in seconds.
    #[serde(default)]
    pub duration: f64,
    /// Completion time, seconds since the Unix epoch.
    #[serde(default)]
    pub time: f64,
    #[serde(default = "zero_pid", deserialize_with = "string_or_number")]
    pub pid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Periodic per-worker report; `master` is filled only by the elected leader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    #[serde(default)]
    pub agent_id: String,
    /// Report time, seconds since the Unix epoch.
    #[serde(default, alias = "timestamp")]
    pub time: f64,
    #[serde(default, with = "master_field")]
    pub master: Option<ProcInfo>,
    #[serde(default)]
    pub workers: BTreeMap<String, ProcInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat: Option<u64>,
}

/// Leader assignment published by the hub. Agents discard packets whose
/// `agent_id` is not their own; `heartbeat` orders packets across the
/// lossy fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPacket {
    pub agent_id: String,
    pub leader: u32,
    pub heartbeat: u64,
}

/// Telemetry dispatch by the `type` discriminator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Metric {
    #[serde(rename = "http")]
    Http(HttpEvent),
    #[serde(rename = "worker_status")]
    WorkerStatus(WorkerStatus),
}

impl Metric {
    pub fn message_type(&self) -> &'static str {
        match self {
            Metric::Http(_) => "http",
            Metric::WorkerStatus(_) => "worker_status",
        }
    }
}

fn unknown() -> String {
    "unknown".to_string()
}

fn zero_pid() -> String {
    "0".to_string()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("expected string or number, got {other}"))),
    }
}

fn status_lenient<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| D::Error::custom("status out of range")),
        serde_json::Value::String(s) => {
            s.parse::<u16>().map_err(|_| D::Error::custom("status not a number"))
        }
        serde_json::Value::Null => Ok(0),
        other => Err(D::Error::custom(format!("expected status, got {other}"))),
    }
}

/// `master` is an empty object, not null, when the sender is not the leader.
mod master_field {
    use super::*;
    use serde::ser::SerializeMap;
    use serde::Serializer;

    pub fn serialize<S>(value: &Option<ProcInfo>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(info) => info.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<ProcInfo>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Object(map) if map.is_empty() => Ok(None),
            other => ProcInfo::deserialize(other).map(Some).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
