// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process inspection for worker and master reporting.
//!
//! Everything here is best-effort: a process can exit between discovery and
//! sampling, so per-process failures surface as errors the caller swallows,
//! and batch operations never abort on a single bad process.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System, MINIMUM_CPU_UPDATE_INTERVAL};
use thiserror::Error;

/// Snapshot of one process, in the shape the wire carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcInfo {
    pub pid: u32,
    #[serde(default)]
    pub parent_pid: Option<u32>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cmdline: Vec<String>,
    /// CPU usage in percent over the sampling window.
    #[serde(default)]
    pub cpu: f64,
    /// Resident set size in bytes.
    #[serde(default)]
    pub memory: u64,
    /// Process start time, seconds since the Unix epoch.
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub num_threads: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat: Option<u64>,
}

/// Master/workers pair reported by one worker each tick.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerMetrics {
    pub master: Option<ProcInfo>,
    pub workers: BTreeMap<String, ProcInfo>,
}

#[derive(Debug, Error)]
pub enum ProcError {
    #[error("no such process: {0}")]
    NotFound(u32),
}

/// Inspect the current process.
pub fn self_info() -> Result<ProcInfo, ProcError> {
    info_of(std::process::id())
}

/// Inspect an arbitrary process by pid.
///
/// CPU usage needs two samples; the call blocks for the minimum sampling
/// window the backing library supports.
pub fn info_of(pid: u32) -> Result<ProcInfo, ProcError> {
    let target = Pid::from_u32(pid);
    let mut sys = System::new();
    if !sys.refresh_process(target) {
        return Err(ProcError::NotFound(pid));
    }
    std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_process(target);
    let process = sys.process(target).ok_or(ProcError::NotFound(pid))?;
    Ok(extract(process))
}

/// Convert a sampled process into the wire shape.
pub fn extract(process: &sysinfo::Process) -> ProcInfo {
    let pid = process.pid().as_u32();
    ProcInfo {
        pid,
        parent_pid: process.parent().map(|p| p.as_u32()),
        name: process.name().to_string(),
        cmdline: process.cmd().to_vec(),
        cpu: process.cpu_usage() as f64,
        memory: process.memory(),
        start_time: process.start_time() as f64,
        num_threads: thread_count(pid),
        heartbeat: None,
    }
}

/// Live children of `pid`, recursively. Unreadable processes are skipped.
pub fn children_of(pid: u32) -> Vec<ProcInfo> {
    let mut sys = System::new_all();
    std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_processes();

    let mut children = Vec::new();
    let mut frontier = vec![Pid::from_u32(pid)];
    while let Some(parent) = frontier.pop() {
        for process in sys.processes().values() {
            if process.parent() == Some(parent) {
                frontier.push(process.pid());
                children.push(extract(process));
            }
        }
    }
    children
}

/// Whether a process with this pid exists right now.
pub fn pid_exists(pid: u32) -> bool {
    let mut sys = System::new();
    sys.refresh_process(Pid::from_u32(pid))
}

/// Build the master/workers report for one tick.
///
/// `workers` always holds exactly the current process; `master` is filled
/// with the parent process only when this worker is the elected leader.
/// Failures reading the parent are swallowed (it may have just exited).
pub fn worker_metrics(leader: Option<u32>, heartbeat: Option<u64>) -> Result<WorkerMetrics, ProcError> {
    let mut own = self_info()?;
    own.heartbeat = heartbeat;

    let master = match (leader, own.parent_pid) {
        (Some(leader), Some(parent)) if leader == own.pid => info_of(parent).ok(),
        _ => None,
    };

    let mut workers = BTreeMap::new();
    workers.insert(own.pid.to_string(), own);
    Ok(WorkerMetrics { master, workers })
}

#[cfg(target_os = "linux")]
fn thread_count(pid: u32) -> u32 {
    std::fs::read_dir(format!("/proc/{pid}/task"))
        .map(|entries| entries.count() as u32)
        .unwrap_or(1)
}

#[cfg(not(target_os = "linux"))]
fn thread_count(_pid: u32) -> u32 {
    1
}

#[cfg(test)]
#[path = "proc_tests.rs"]
mod tests;
