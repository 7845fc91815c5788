// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stable per-host agent identity.
//!
//! The id ties every worker on a host to one agent: `DASHCORN_AGENT_ID` when
//! set, otherwise `hostname-mac` with the MAC taken from the first preferred
//! interface that has one, otherwise the bare hostname.

use std::sync::OnceLock;

use sysinfo::{MacAddr, Networks, System};

/// Interfaces probed for a MAC address, in order.
pub const PREFERRED_INTERFACES: [&str; 3] = ["eth0", "en0", "wlan0"];

static AGENT_ID: OnceLock<String> = OnceLock::new();

/// The agent id for this process, derived once and cached.
pub fn agent_id() -> &'static str {
    AGENT_ID.get_or_init(|| {
        compose_agent_id(
            std::env::var("DASHCORN_AGENT_ID").ok(),
            System::host_name(),
            first_mac(&PREFERRED_INTERFACES),
        )
    })
}

/// Pure composition rule behind [`agent_id`].
pub fn compose_agent_id(
    override_id: Option<String>,
    hostname: Option<String>,
    mac: Option<String>,
) -> String {
    if let Some(id) = override_id.filter(|id| !id.is_empty()) {
        return id;
    }
    let host = hostname.unwrap_or_else(|| "localhost".to_string());
    match mac {
        Some(mac) => format!("{host}-{}", mac.replace(':', "")),
        None => host,
    }
}

fn first_mac(preferred: &[&str]) -> Option<String> {
    let networks = Networks::new_with_refreshed_list();
    for iface in preferred {
        let found = networks
            .iter()
            .find(|(name, _)| name.as_str() == *iface)
            .map(|(_, data)| data.mac_address());
        if let Some(mac) = found {
            if mac != MacAddr::UNSPECIFIED {
                return Some(mac.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
#[path = "ident_tests.rs"]
mod tests;
