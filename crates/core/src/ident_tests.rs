// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    override_wins = { Some("custom-id"), Some("host"), Some("aa:bb:cc:dd:ee:ff"), "custom-id" },
    empty_override_ignored = { Some(""), Some("host"), None, "host" },
    host_and_mac = { None, Some("web1"), Some("aa:bb:cc:dd:ee:ff"), "web1-aabbccddeeff" },
    host_only = { None, Some("web1"), None, "web1" },
    no_hostname = { None, None, None, "localhost" },
)]
fn composition_rule(
    override_id: Option<&str>,
    hostname: Option<&str>,
    mac: Option<&str>,
    expected: &str,
) {
    let id = compose_agent_id(
        override_id.map(str::to_string),
        hostname.map(str::to_string),
        mac.map(str::to_string),
    );
    assert_eq!(id, expected);
}

#[test]
fn agent_id_is_memoized() {
    let first = agent_id();
    let second = agent_id();
    assert!(std::ptr::eq(first, second));
    assert!(!first.is_empty());
}
