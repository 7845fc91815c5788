// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/reply client for the process supervisor.

use std::time::Duration;

use anyhow::Context;

use dashcorn_wire::{read_json, write_json, Command, Endpoint, Reply, DEFAULT_PM_SOCKET};

/// Talks to the supervisor socket with a bounded receive timeout.
pub struct ControlClient {
    endpoint: Endpoint,
    timeout: Duration,
}

impl ControlClient {
    /// Default endpoint and timeout (`DASHCORN_ZMQ_TIMEOUT_MS`, 5 s).
    pub fn new() -> Self {
        let endpoint = Endpoint::Ipc {
            path: std::env::var("DASHCORN_PM_SOCKET")
                .unwrap_or_else(|_| DEFAULT_PM_SOCKET.to_string())
                .into(),
        };
        let timeout = std::env::var("DASHCORN_ZMQ_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(5));
        Self { endpoint, timeout }
    }

    pub fn with_parts(endpoint: Endpoint, timeout: Duration) -> Self {
        Self { endpoint, timeout }
    }

    /// Send one command and await one reply. Transport failures and
    /// timeouts come back as an error-status reply, never as a panic.
    pub async fn send(&self, command: &Command) -> Reply {
        match self.request(command).await {
            Ok(reply) => reply,
            Err(err) => Reply::error(format!("{err:#}")),
        }
    }

    async fn request(&self, command: &Command) -> anyhow::Result<Reply> {
        let mut conn = tokio::time::timeout(self.timeout, self.endpoint.connect())
            .await
            .with_context(|| format!("timed out connecting to {}", self.endpoint))?
            .with_context(|| format!("cannot reach the hub supervisor at {}", self.endpoint))?;
        write_json(&mut conn, command)
            .await
            .with_context(|| format!("failed to send {}", command.name()))?;
        let reply = tokio::time::timeout(self.timeout, read_json(&mut conn))
            .await
            .with_context(|| format!("timed out waiting for a {} reply", command.name()))??;
        Ok(reply)
    }
}

impl Default for ControlClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
