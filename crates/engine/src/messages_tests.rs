// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::test_helpers::room;
use masc_core::{Error, MsgType};
use std::sync::Arc;

#[test]
fn broadcast_allocates_increasing_seqs() {
    let t = room();
    t.join_all(&["a1"]);
    let s1 = t.engine.broadcast("a1", "one", None).unwrap();
    let s2 = t.engine.broadcast("a1", "two", None).unwrap();
    assert_eq!((s1, s2), (1, 2));

    let room_state = t.engine.room().unwrap();
    assert_eq!(room_state.message_seq, 3);
}

#[test]
fn get_messages_pages_by_seq() {
    let t = room();
    t.join_all(&["a1"]);
    for i in 0..5 {
        t.engine
            .broadcast("a1", &format!("m{i}"), None)
            .unwrap();
    }

    let page = t.engine.get_messages(0, 3).unwrap();
    assert_eq!(page.messages.len(), 3);
    assert_eq!(page.messages[0].seq, 1);
    assert_eq!(page.messages[2].seq, 3);

    let rest = t
        .engine
        .get_messages_after(page.next_cursor.as_deref().unwrap(), 100)
        .unwrap();
    assert_eq!(rest.messages.len(), 2);
    assert_eq!(rest.messages[0].seq, 4);
}

#[test]
fn seq_gap_after_write_failure_is_tolerated() {
    let t = room();
    t.join_all(&["a1"]);
    t.engine.broadcast("a1", "before", None).unwrap();

    t.backend.set_fail_puts(true);
    let err = t.engine.broadcast("a1", "lost", None).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    t.backend.set_fail_puts(false);

    t.engine.broadcast("a1", "after", None).unwrap();
    let page = t.engine.get_messages(0, 100).unwrap();
    let seqs: Vec<u64> = page.messages.iter().map(|m| m.seq).collect();
    // Seq 2 was consumed by the failed write
    assert_eq!(seqs, vec![1, 3]);
}

#[test]
fn concurrent_broadcasts_get_unique_seqs() {
    let t = room();
    t.join_all(&["a1", "a2"]);

    let mut handles = Vec::new();
    for agent in ["a1", "a2"] {
        let engine = Arc::clone(&t.engine);
        handles.push(std::thread::spawn(move || {
            (0..10)
                .map(|i| engine.broadcast(agent, &format!("{agent}-{i}"), None).unwrap())
                .collect::<Vec<u64>>()
        }));
    }
    let mut all: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), 20);

    let page = t.engine.get_messages(0, 100).unwrap();
    assert_eq!(page.messages.len(), 20);
    let seqs: Vec<u64> = page.messages.iter().map(|m| m.seq).collect();
    let mut sorted = seqs.clone();
    sorted.sort_unstable();
    assert_eq!(seqs, sorted, "messages must come back in seq order");
}

#[test]
fn mentions_and_types_survive_the_round_trip() {
    let t = room();
    t.join_all(&["a1", "a2"]);
    t.engine
        .broadcast("a1", "look here", Some("a2".to_string()))
        .unwrap();
    t.engine.system_message("sys".to_string(), None).unwrap();

    let page = t.engine.get_messages(0, 10).unwrap();
    assert_eq!(page.messages[0].msg_type, MsgType::Broadcast);
    assert_eq!(page.messages[0].mention.as_deref(), Some("a2"));
    assert_eq!(page.messages[1].msg_type, MsgType::System);
    assert_eq!(page.messages[1].from_agent, "room");
}

#[test]
fn broadcast_requires_a_known_active_agent() {
    let t = room();
    assert!(matches!(
        t.engine.broadcast("ghost", "x", None),
        Err(Error::AgentNotFound { .. })
    ));
}

#[test]
fn broadcast_events_fan_out_with_content() {
    let t = room();
    t.join_all(&["a1"]);
    let sub = t.fabric.subscribe(None, Default::default(), 0);
    t.engine.broadcast("a1", "hello room", None).unwrap();

    let events = t.fabric.poll_events(&sub, true).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].agent, "a1");
    assert_eq!(events[0].data["content"], "hello room");
}
