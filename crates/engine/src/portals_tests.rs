// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::test_helpers::room;
use masc_core::{CancellationToken, Error, MsgType};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn open_send_status_close() {
    let t = room();
    t.join_all(&["a1", "a2"]);
    t.engine.portal_open("a1", "a2").unwrap();

    t.engine
        .portal_send("a1", "ping", Duration::from_secs(1), None)
        .unwrap();
    t.engine
        .portal_send("a2", "pong", Duration::from_secs(1), None)
        .unwrap();

    let portal = t.engine.portal_status("a2").unwrap().unwrap();
    assert_eq!(portal.owner, "a1");
    assert_eq!(portal.messages.len(), 2);
    assert_eq!(portal.messages[0].from, "a1");
    assert_eq!(portal.messages[1].content, "pong");

    t.engine.portal_close("a1").unwrap();
    assert!(t.engine.portal_status("a1").unwrap().is_none());
}

#[test]
fn one_open_portal_per_owner() {
    let t = room();
    t.join_all(&["a1", "a2", "a3"]);
    t.engine.portal_open("a1", "a2").unwrap();
    let err = t.engine.portal_open("a1", "a3").unwrap_err();
    assert!(matches!(err, Error::PortalBusy { .. }));
}

#[test]
fn portal_needs_two_known_distinct_agents() {
    let t = room();
    t.join_all(&["a1"]);
    assert!(matches!(
        t.engine.portal_open("a1", "a1"),
        Err(Error::Schema { .. })
    ));
    assert!(matches!(
        t.engine.portal_open("a1", "ghost"),
        Err(Error::AgentNotFound { .. })
    ));
}

#[test]
fn close_without_portal_fails() {
    let t = room();
    t.join_all(&["a1"]);
    assert!(matches!(
        t.engine.portal_close("a1"),
        Err(Error::PortalNotOpen { .. })
    ));
}

#[test]
fn send_times_out_when_no_portal_appears() {
    let t = room();
    t.join_all(&["a1"]);

    let engine = Arc::clone(&t.engine);
    let waiter = std::thread::spawn(move || {
        engine.portal_send("a1", "x", Duration::from_secs(10), None)
    });

    // Let the sender park, then step the clock past its deadline.
    std::thread::sleep(Duration::from_millis(50));
    t.clock.advance(Duration::from_secs(11));

    let err = waiter.join().unwrap().unwrap_err();
    assert_eq!(err, Error::Timeout);
}

#[test]
fn send_wakes_when_peer_opens() {
    let t = room();
    t.join_all(&["a1", "a2"]);

    let engine = Arc::clone(&t.engine);
    let sender = std::thread::spawn(move || {
        engine.portal_send("a2", "hello", Duration::from_secs(5), None)
    });

    std::thread::sleep(Duration::from_millis(50));
    t.engine.portal_open("a1", "a2").unwrap();
    sender.join().unwrap().unwrap();

    let portal = t.engine.portal_status("a1").unwrap().unwrap();
    assert_eq!(portal.messages[0].content, "hello");
}

#[test]
fn cancellation_interrupts_the_wait() {
    let t = room();
    t.join_all(&["a1"]);
    let token = CancellationToken::new("t1", 0);
    token.cancel("shutting down");

    let err = t
        .engine
        .portal_send("a1", "x", Duration::from_secs(30), Some(&token))
        .unwrap_err();
    assert_eq!(
        err,
        Error::Cancelled {
            reason: "shutting down".into()
        }
    );
}

#[test]
fn portal_messages_are_mirrored_into_the_log() {
    let t = room();
    t.join_all(&["a1", "a2"]);
    t.engine.portal_open("a1", "a2").unwrap();
    t.engine
        .portal_send("a1", "secret-ish", Duration::from_secs(1), None)
        .unwrap();

    let page = t.engine.get_messages(0, 10).unwrap();
    let mirrored = page
        .messages
        .iter()
        .find(|m| m.msg_type == MsgType::Portal)
        .unwrap();
    assert_eq!(mirrored.from_agent, "a1");
    assert_eq!(mirrored.mention.as_deref(), Some("a2"));
}

#[test]
fn buffer_caps_at_portal_limit() {
    let t = room();
    t.join_all(&["a1", "a2"]);
    t.engine.portal_open("a1", "a2").unwrap();
    for i in 0..masc_core::PORTAL_BUFFER_CAP + 5 {
        t.engine
            .portal_send("a1", &format!("m{i}"), Duration::from_secs(1), None)
            .unwrap();
    }
    let portal = t.engine.portal_status("a1").unwrap().unwrap();
    assert_eq!(portal.messages.len(), masc_core::PORTAL_BUFFER_CAP);
    assert_eq!(portal.messages.front().unwrap().content, "m5");
}
