// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn self_info_reports_the_current_process() {
    let info = self_info().unwrap();
    assert_eq!(info.pid, std::process::id());
    assert!(info.parent_pid.is_some());
    assert!(info.num_threads >= 1);
    assert!(info.start_time > 0.0);
}

#[test]
fn info_of_missing_pid_is_an_error() {
    // Pids near the u32 ceiling are far beyond any kernel default pid_max.
    let err = info_of(u32::MAX - 7).unwrap_err();
    assert!(matches!(err, ProcError::NotFound(_)));
}

#[test]
fn pid_exists_matches_reality() {
    assert!(pid_exists(std::process::id()));
    assert!(!pid_exists(u32::MAX - 7));
}

#[test]
fn worker_metrics_without_leadership_has_no_master() {
    let metrics = worker_metrics(None, None).unwrap();
    assert!(metrics.master.is_none());
    assert_eq!(metrics.workers.len(), 1);
    let own = &metrics.workers[&std::process::id().to_string()];
    assert_eq!(own.pid, std::process::id());
    assert_eq!(own.heartbeat, None);
}

#[test]
fn worker_metrics_for_another_leader_has_no_master() {
    let metrics = worker_metrics(Some(1), Some(3)).unwrap();
    assert!(metrics.master.is_none());
    let own = &metrics.workers[&std::process::id().to_string()];
    assert_eq!(own.heartbeat, Some(3));
}

#[test]
fn elected_leader_reports_the_parent_as_master() {
    let metrics = worker_metrics(Some(std::process::id()), Some(0)).unwrap();
    let own = &metrics.workers[&std::process::id().to_string()];
    let master = metrics.master.expect("leader should sample the parent");
    assert_eq!(Some(master.pid), own.parent_pid);
}

#[test]
fn proc_info_round_trips_through_json() {
    let info = ProcInfo {
        pid: 42,
        parent_pid: Some(1),
        name: "uvicorn".into(),
        cmdline: vec!["uvicorn".into(), "app:app".into()],
        cpu: 1.5,
        memory: 1024,
        start_time: 1_700_000_000.0,
        num_threads: 4,
        heartbeat: Some(2),
    };
    let json = serde_json::to_string(&info).unwrap();
    let back: ProcInfo = serde_json::from_str(&json).unwrap();
    assert_eq!(back, info);
}
