// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dashcorn-hub: the central aggregation process.
//!
//! The hub ingests agent telemetry into a TTL-bounded in-memory store,
//! rotates a leader worker per agent over the control channel, exposes the
//! aggregated state as JSON and as Prometheus text, and supervises child
//! serving processes over a local request/reply socket.

pub mod collector;
pub mod config;
pub mod control;
pub mod exporter;
pub mod http;
pub mod lifecycle;
pub mod pidfile;
pub mod selector;
pub mod state;
pub mod supervisor;

pub use collector::MetricsCollector;
pub use config::HubConfig;
pub use control::ControlPublisher;
pub use exporter::{ExportScheduler, MetricsExporter};
pub use http::{ExpositionServer, HubApiServer};
pub use lifecycle::{HubService, LifecycleError};
pub use pidfile::PidFile;
pub use selector::LeaderSelector;
pub use state::{AgentSnapshot, RealtimeState, StateConfig, StateSnapshot};
pub use supervisor::{ProcessExecutor, ProcessManager, ProcessRegistry, Spawn, UvicornSpawner};
