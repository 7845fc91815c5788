// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/reply protocol between the operator CLI and the process
//! supervisor.
//!
//! Requests are `{cmd, args}` objects; replies always carry a `status` and
//! whatever payload the command produces.

use serde::{Deserialize, Serialize};

pub use dashcorn_core::ProcInfo;

/// Default supervisor endpoint path (`ipc://` form).
pub const DEFAULT_PM_SOCKET: &str = "/tmp/dashcorn-pm.sock";

/// Arguments to `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartArgs {
    pub name: String,
    pub app_path: String,
    /// Name of the application variable inside the module.
    #[serde(default = "default_app_object")]
    pub app_object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Missing means the default port; an explicit null means no `--port`.
    #[serde(default = "default_port")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

impl StartArgs {
    pub fn new(name: impl Into<String>, app_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            app_path: app_path.into(),
            app_object: default_app_object(),
            python_path: None,
            host: None,
            port: default_port(),
            workers: None,
            cwd: None,
        }
    }
}

fn default_app_object() -> String {
    "app".to_string()
}

fn default_port() -> Option<u16> {
    Some(7979)
}

/// Supervisor commands as sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "args", rename_all = "snake_case")]
pub enum Command {
    Start(StartArgs),
    Stop { name: String },
    Restart { name: String },
    List {},
    Delete { name: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start(_) => "start",
            Command::Stop { .. } => "stop",
            Command::Restart { .. } => "restart",
            Command::List {} => "list",
            Command::Delete { .. } => "delete",
        }
    }
}

/// Registry record for one managed process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcRecord {
    pub pid: u32,
    pub app_path: String,
    /// Seconds since the Unix epoch.
    pub start_time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Crashed,
}

/// One row of a `list` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessEntry {
    pub name: String,
    pub pid: u32,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStatus {
    Ok,
    AlreadyExists,
    NotFound,
    AlreadyStopped,
    Error,
}

/// Supervisor reply. `status` is always present; the rest depends on the
/// command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub status: ReplyStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, rename = "proc", skip_serializing_if = "Option::is_none")]
    pub proc_record: Option<ProcRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processes: Option<Vec<ProcessEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Reply {
    pub fn with_status(status: ReplyStatus) -> Self {
        Self { status, pid: None, proc_record: None, processes: None, message: None }
    }

    pub fn ok() -> Self {
        Self::with_status(ReplyStatus::Ok)
    }

    pub fn error(message: impl Into<String>) -> Self {
        let mut reply = Self::with_status(ReplyStatus::Error);
        reply.message = Some(message.into());
        reply
    }

    pub fn pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn proc_record(mut self, record: ProcRecord) -> Self {
        self.proc_record = Some(record);
        self
    }

    pub fn processes(mut self, processes: Vec<ProcessEntry>) -> Self {
        self.processes = Some(processes);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == ReplyStatus::Ok
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
