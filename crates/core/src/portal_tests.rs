// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn portal_has_two_endpoints() {
    let p = Portal::new("a1", "a2", Utc::now());
    assert!(p.involves("a1"));
    assert!(p.involves("a2"));
    assert!(!p.involves("a3"));
}

#[test]
fn push_updates_last_activity() {
    let opened = Utc::now();
    let mut p = Portal::new("a1", "a2", opened);
    let later = opened + chrono::Duration::seconds(5);
    p.push("a2", "hello", later);
    assert_eq!(p.messages.len(), 1);
    assert_eq!(p.last_activity, later);
}

#[test]
fn buffer_drops_oldest_at_capacity() {
    let now = Utc::now();
    let mut p = Portal::new("a1", "a2", now);
    for i in 0..PORTAL_BUFFER_CAP + 10 {
        p.push("a1", format!("m{i}"), now);
    }
    assert_eq!(p.messages.len(), PORTAL_BUFFER_CAP);
    assert_eq!(p.messages.front().unwrap().content, "m10");
    assert_eq!(
        p.messages.back().unwrap().content,
        format!("m{}", PORTAL_BUFFER_CAP + 9)
    );
}
