// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn record(pid: u32) -> ProcRecord {
    ProcRecord { pid, app_path: "pkg/app.py".into(), start_time: 1_700_000_000.0 }
}

#[test]
fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ProcessRegistry::load(dir.path().join("running.json")).unwrap();
    assert!(registry.is_empty());
}

#[test]
fn save_and_reload_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("running.json");

    let mut registry = ProcessRegistry::load(path.clone()).unwrap();
    registry.insert("demo".into(), record(42));
    registry.save().unwrap();

    let reloaded = ProcessRegistry::load(path).unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.get("demo").unwrap().pid, 42);
}

#[test]
fn persisted_form_is_pretty_json_keyed_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("running.json");

    let mut registry = ProcessRegistry::load(path.clone()).unwrap();
    registry.insert("demo".into(), record(42));
    registry.save().unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.contains('\n'), "expected pretty-printed output");
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["demo"]["pid"], 42);
    assert_eq!(value["demo"]["app_path"], "pkg/app.py");
}

#[test]
fn corrupt_files_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("running.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let err = ProcessRegistry::load(path).unwrap_err();
    assert!(matches!(err, RegistryError::Corrupt(_, _)));
}

#[test]
fn remove_forgets_an_entry() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = ProcessRegistry::load(dir.path().join("running.json")).unwrap();
    registry.insert("demo".into(), record(1));
    assert!(registry.remove("demo").is_some());
    assert!(registry.remove("demo").is_none());
    assert!(!registry.contains("demo"));
}
