// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent control state: the currently elected leader and its heartbeat.

use std::time::Duration;

use parking_lot::Mutex;

use dashcorn_core::{agent_id, Clock, SystemClock};
use dashcorn_wire::ControlPacket;

struct Inner {
    leader: Option<u32>,
    leader_since: std::time::Instant,
    heartbeat: Option<u64>,
}

/// Holds the leader assignment for this agent, scoped by agent id.
pub struct SettingsStore<C: Clock = SystemClock> {
    agent_id: String,
    clock: C,
    inner: Mutex<Inner>,
}

impl SettingsStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_parts(agent_id().to_string(), SystemClock)
    }
}

impl Default for SettingsStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SettingsStore<C> {
    pub fn with_parts(agent_id: String, clock: C) -> Self {
        let now = clock.now();
        Self {
            agent_id,
            clock,
            inner: Mutex::new(Inner { leader: None, leader_since: now, heartbeat: None }),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Accept a control packet. Packets for other agents leave the store
    /// unchanged.
    pub fn update(&self, packet: &ControlPacket) {
        if packet.agent_id != self.agent_id {
            tracing::debug!(
                "ignoring control packet for {} (this agent is {})",
                packet.agent_id,
                self.agent_id
            );
            return;
        }
        let mut inner = self.inner.lock();
        inner.leader = Some(packet.leader);
        inner.leader_since = self.clock.now();
        inner.heartbeat = Some(packet.heartbeat);
    }

    pub fn leader(&self) -> Option<u32> {
        self.inner.lock().leader
    }

    pub fn heartbeat(&self) -> Option<u64> {
        self.inner.lock().heartbeat
    }

    /// Whether the current leader assignment is younger than `ttl`.
    pub fn is_leader_valid(&self, ttl: Duration) -> bool {
        let inner = self.inner.lock();
        inner.leader.is_some() && self.clock.now().duration_since(inner.leader_since) < ttl
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
