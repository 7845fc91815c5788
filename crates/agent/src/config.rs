// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent configuration, environment-driven.

use std::path::PathBuf;
use std::time::Duration;

use dashcorn_wire::Endpoint;

pub const DEFAULT_METRICS_ADDRESS: &str = "127.0.0.1:5556";
pub const DEFAULT_CONTROL_ADDRESS: &str = "127.0.0.1:5557";
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(4);

/// Runtime configuration for one agent instance.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Where metrics are pushed (hub's pull side).
    pub metrics_endpoint: Endpoint,
    /// Where control packets are subscribed from (hub's publish side).
    pub control_endpoint: Endpoint,
    /// Reserved: transport-level curve auth toggle.
    pub use_curve_auth: bool,
    /// Reserved: certificate directory for curve auth.
    pub cert_dir: Option<PathBuf>,
    /// Worker-status report interval.
    pub interval: Duration,
    pub enable_logging: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AgentConfig {
    /// Build the configuration from `DASHCORN_*` environment variables,
    /// falling back to the documented defaults.
    pub fn from_env() -> Self {
        let metrics_endpoint = endpoint_from_env(
            "DASHCORN_ZMQ_PUSH_METRICS_PROTOCOL",
            "DASHCORN_ZMQ_PUSH_METRICS_ADDRESS",
            DEFAULT_METRICS_ADDRESS,
        );
        let control_endpoint = endpoint_from_env(
            "DASHCORN_ZMQ_SUB_CONTROL_PROTOCOL",
            "DASHCORN_ZMQ_SUB_CONTROL_ADDRESS",
            DEFAULT_CONTROL_ADDRESS,
        );
        Self {
            metrics_endpoint,
            control_endpoint,
            use_curve_auth: env_bool("DASHCORN_USE_CURVE", false),
            cert_dir: std::env::var("DASHCORN_CERT_DIR").ok().map(PathBuf::from),
            interval: Duration::from_secs_f64(
                env_float("DASHCORN_INTERVAL", DEFAULT_REPORT_INTERVAL.as_secs_f64()),
            ),
            enable_logging: env_bool("DASHCORN_ENABLE_LOGGING", false),
        }
    }
}

pub(crate) fn endpoint_from_env(
    protocol_key: &str,
    address_key: &str,
    default_address: &str,
) -> Endpoint {
    let protocol = std::env::var(protocol_key).unwrap_or_else(|_| "tcp".to_string());
    let address = std::env::var(address_key).unwrap_or_else(|_| default_address.to_string());
    Endpoint::new(&protocol, &address).unwrap_or_else(|err| {
        tracing::warn!("invalid endpoint {protocol}://{address} ({err}), using default");
        Endpoint::new("tcp", default_address)
            .unwrap_or(Endpoint::Tcp { host: "127.0.0.1".to_string(), port: 5556 })
    })
}

pub(crate) fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(value) => value.trim().eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}

pub(crate) fn env_float(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
