// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn pidfile(dir: &tempfile::TempDir) -> PidFile {
    PidFile::new(dir.path().join("nested").join("hub.pid"))
}

#[test]
fn write_then_read_the_own_pid() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = pidfile(&dir);
    pidfile.write().unwrap();
    assert_eq!(pidfile.read(), Some(std::process::id()));
    // The content is plain decimal ASCII
    let raw = std::fs::read_to_string(pidfile.path()).unwrap();
    assert_eq!(raw, std::process::id().to_string());
}

#[test]
fn missing_file_reads_as_absent_and_dead() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = pidfile(&dir);
    assert_eq!(pidfile.read(), None);
    assert!(!pidfile.is_alive());
}

#[test]
fn own_pid_counts_as_alive() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = pidfile(&dir);
    pidfile.write().unwrap();
    assert!(pidfile.is_alive());
}

#[test]
fn dead_pid_counts_as_dead() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = pidfile(&dir);
    std::fs::create_dir_all(pidfile.path().parent().unwrap()).unwrap();
    std::fs::write(pidfile.path(), "999999999").unwrap();
    assert!(!pidfile.is_alive());
}

#[test]
fn garbage_content_counts_as_dead() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = pidfile(&dir);
    std::fs::create_dir_all(pidfile.path().parent().unwrap()).unwrap();
    std::fs::write(pidfile.path(), "not-a-pid").unwrap();
    assert!(!pidfile.is_alive());
}

#[test]
fn remove_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let pidfile = pidfile(&dir);
    pidfile.write().unwrap();
    pidfile.remove();
    assert!(!pidfile.path().exists());
    pidfile.remove();
}
