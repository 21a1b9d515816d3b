// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    simple = { "a1" },
    dashes = { "build-agent" },
    underscores = { "agent_7" },
    single = { "x" },
    mixed = { "Agent-42_b" },
)]
fn valid_names(name: &str) {
    assert!(validate_agent_name(name).is_ok());
}

#[parameterized(
    empty = { "" },
    slash = { "a/b" },
    dot_dot = { "../etc" },
    space = { "agent one" },
    unicode = { "agénte" },
    pipe = { "a|b" },
)]
fn invalid_names(name: &str) {
    assert!(matches!(
        validate_agent_name(name),
        Err(crate::Error::Schema { .. })
    ));
}

#[test]
fn name_length_boundary() {
    let ok = "a".repeat(64);
    assert!(validate_agent_name(&ok).is_ok());
    let too_long = "a".repeat(65);
    assert!(validate_agent_name(&too_long).is_err());
}

#[test]
fn new_record_is_active_with_no_task() {
    let now = Utc::now();
    let rec = AgentRecord::new("a1", vec!["rust".into()], now);
    assert_eq!(rec.status, AgentStatus::Active);
    assert!(rec.is_active());
    assert!(rec.current_task.is_none());
    assert_eq!(rec.joined_at, rec.last_seen);
}

#[test]
fn capability_match_requires_all() {
    let rec = AgentRecord::new("a1", vec!["rust".into(), "sql".into()], Utc::now());
    assert!(rec.has_capabilities(&[]));
    assert!(rec.has_capabilities(&["rust".into()]));
    assert!(rec.has_capabilities(&["rust".into(), "sql".into()]));
    assert!(!rec.has_capabilities(&["go".into()]));
}

#[test]
fn meta_defaults_stay_out_of_json() {
    let rec = AgentRecord::new("a1", vec![], Utc::now());
    let json = serde_json::to_value(&rec).unwrap();
    assert!(json["meta"].as_object().unwrap().is_empty());
    assert!(json.get("current_task").is_none());
}

#[test]
fn status_serde_is_lowercase() {
    assert_eq!(
        serde_json::to_string(&AgentStatus::Inactive).unwrap(),
        "\"inactive\""
    );
    let s: AgentStatus = serde_json::from_str("\"busy\"").unwrap();
    assert_eq!(s, AgentStatus::Busy);
}
