// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hub configuration, environment-driven, plus the well-known state paths.

use std::path::PathBuf;
use std::time::Duration;

use dashcorn_wire::{Endpoint, DEFAULT_PM_SOCKET};

pub const DEFAULT_METRICS_BIND: &str = "*:5556";
pub const DEFAULT_CONTROL_BIND: &str = "*:5557";
pub const DEFAULT_HUB_HOST: &str = "127.0.0.1";
pub const DEFAULT_HUB_PORT: u16 = 5555;
pub const DEFAULT_PROM_HOST: &str = "0.0.0.0";
pub const DEFAULT_PROM_PORT: u16 = 9100;

/// Runtime configuration for the hub process.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Metrics ingress bind (agents push here).
    pub metrics_endpoint: Endpoint,
    /// Control egress bind (agents subscribe here).
    pub control_endpoint: Endpoint,
    /// Supervisor request/reply bind.
    pub pm_endpoint: Endpoint,
    /// Reserved: transport-level curve auth toggle.
    pub use_curve_auth: bool,
    /// Reserved: certificate directory for curve auth.
    pub cert_dir: Option<PathBuf>,
    /// Leader election interval.
    pub leader_rotate_interval: Duration,
    /// Exposition aggregation interval.
    pub aggregate_interval: Duration,
    /// Slow-joiner delay before the first control publish.
    pub publish_delay: Duration,
    /// JSON API bind.
    pub hub_host: String,
    pub hub_port: u16,
    /// Exposition HTTP bind.
    pub prom_host: String,
    pub prom_port: u16,
    /// Metric name prefix for the exposition families.
    pub metric_prefix: String,
    pub enable_logging: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl HubConfig {
    /// Build the configuration from `DASHCORN_*` environment variables,
    /// falling back to the documented defaults.
    pub fn from_env() -> Self {
        let metrics_endpoint = endpoint_from_env(
            "DASHCORN_ZMQ_PULL_METRICS_PROTOCOL",
            "DASHCORN_ZMQ_PULL_METRICS_ADDRESS",
            DEFAULT_METRICS_BIND,
        );
        let control_endpoint = endpoint_from_env(
            "DASHCORN_ZMQ_PUB_CONTROL_PROTOCOL",
            "DASHCORN_ZMQ_PUB_CONTROL_ADDRESS",
            DEFAULT_CONTROL_BIND,
        );
        let pm_endpoint = Endpoint::Ipc {
            path: PathBuf::from(
                std::env::var("DASHCORN_PM_SOCKET")
                    .unwrap_or_else(|_| DEFAULT_PM_SOCKET.to_string()),
            ),
        };
        Self {
            metrics_endpoint,
            control_endpoint,
            pm_endpoint,
            use_curve_auth: env_bool("DASHCORN_USE_CURVE", false),
            cert_dir: std::env::var("DASHCORN_CERT_DIR").ok().map(PathBuf::from),
            leader_rotate_interval: Duration::from_secs_f64(env_float(
                "DASHCORN_LEADER_ROTATE_INTERVAL",
                5.0,
            )),
            aggregate_interval: Duration::from_secs_f64(env_float(
                "DASHCORN_AGGREGATE_INTERVAL",
                4.0,
            )),
            publish_delay: Duration::from_secs_f64(env_float("DASHCORN_PUBLISH_DELAY", 1.0)),
            hub_host: std::env::var("DASHCORN_HUB_HOST")
                .unwrap_or_else(|_| DEFAULT_HUB_HOST.to_string()),
            hub_port: env_u16("DASHCORN_HUB_PORT", DEFAULT_HUB_PORT),
            prom_host: std::env::var("DASHCORN_PROM_HOST")
                .unwrap_or_else(|_| DEFAULT_PROM_HOST.to_string()),
            prom_port: env_u16("DASHCORN_PROM_PORT", DEFAULT_PROM_PORT),
            metric_prefix: std::env::var("DASHCORN_METRIC_PREFIX")
                .unwrap_or_else(|_| "uvicorn".to_string()),
            enable_logging: env_bool("DASHCORN_ENABLE_LOGGING", false),
        }
    }
}

/// `~/.config/dashcorn`, home of the process registry, pid file, and logs.
pub fn config_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config").join("dashcorn")
}

fn endpoint_from_env(protocol_key: &str, address_key: &str, default_address: &str) -> Endpoint {
    let protocol = std::env::var(protocol_key).unwrap_or_else(|_| "tcp".to_string());
    let address = std::env::var(address_key).unwrap_or_else(|_| default_address.to_string());
    Endpoint::new(&protocol, &address).unwrap_or_else(|err| {
        tracing::warn!("invalid endpoint {protocol}://{address} ({err}), using default");
        Endpoint::new("tcp", default_address)
            .unwrap_or(Endpoint::Tcp { host: "0.0.0.0".to_string(), port: 5556 })
    })
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(value) => value.trim().eq_ignore_ascii_case("true"),
        Err(_) => default,
    }
}

fn env_float(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
