// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dashcorn-core: clocks, TTL containers, process inspection, and agent
//! identity shared by the agent and hub crates.

pub mod clock;
pub mod ident;
pub mod proc;
pub mod ttl;

pub use clock::{Clock, FakeClock, SystemClock};
pub use ident::{agent_id, compose_agent_id, PREFERRED_INTERFACES};
pub use proc::{
    children_of, info_of, pid_exists, self_info, worker_metrics, ProcError, ProcInfo,
    WorkerMetrics,
};
pub use ttl::{ExpiringFifo, IdleExpiringDict, RefreshMap};
