//! Boundary behaviors from the contract.

use crate::prelude::*;
use masc_core::AgentMeta;
use masc_daemon::protocol::{Command, Response};
use masc_engine::MAX_BUFFERED_EVENTS;
use masc_storage::StorageBackend;

#[test]
fn agent_name_length_boundary() {
    let s = stack();

    let ok = "a".repeat(64);
    assert!(matches!(
        s.send(Command::Join {
            agent: ok,
            capabilities: Vec::new(),
            meta: AgentMeta::default(),
        }),
        Response::Agent { .. }
    ));

    let too_long = "a".repeat(65);
    let (kind, _) = expect_error(s.send(Command::Join {
        agent: too_long,
        capabilities: Vec::new(),
        meta: AgentMeta::default(),
    }));
    assert_eq!(kind, "schema_error");

    let (kind, _) = expect_error(s.send(Command::Join {
        agent: "bad/name".into(),
        capabilities: Vec::new(),
        meta: AgentMeta::default(),
    }));
    assert_eq!(kind, "schema_error");
}

#[test]
fn message_seq_crosses_the_u32_boundary() {
    let s = stack();
    s.join(&["a1"]);

    // Jump the counter to just below 2^32
    s.backend
        .atomic_inc("room.message_seq", (u32::MAX as i64) - 1)
        .unwrap();

    let first = match s.send(Command::Broadcast {
        agent: "a1".into(),
        content: "below".into(),
        mention: None,
    }) {
        Response::Seq { seq } => seq,
        other => panic!("unexpected: {other:?}"),
    };
    let second = match s.send(Command::Broadcast {
        agent: "a1".into(),
        content: "above".into(),
        mention: None,
    }) {
        Response::Seq { seq } => seq,
        other => panic!("unexpected: {other:?}"),
    };

    assert_eq!(first, u32::MAX as u64);
    assert_eq!(second, u32::MAX as u64 + 1);

    let page = s.engine.get_messages(first - 1, 10).unwrap();
    let seqs: Vec<u64> = page.messages.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, vec![first, second]);
}

#[test]
fn exactly_full_buffer_plus_one_advances_the_head() {
    let s = stack();
    s.join(&["a1"]);
    let sub = match s.send(Command::Subscribe {
        agent_filter: None,
        event_types: vec![masc_core::EventType::Broadcast],
    }) {
        Response::Subscribed { subscription_id } => subscription_id,
        other => panic!("unexpected: {other:?}"),
    };

    for i in 0..MAX_BUFFERED_EVENTS {
        s.send(Command::Broadcast {
            agent: "a1".into(),
            content: format!("m{i}"),
            mention: None,
        });
    }
    // Buffer holds exactly 100; one more evicts only the head
    s.send(Command::Broadcast {
        agent: "a1".into(),
        content: "overflow".into(),
        mention: None,
    });

    let events = match s.send(Command::PollEvents {
        subscription_id: sub,
        clear: true,
    }) {
        Response::Events { events } => events,
        other => panic!("unexpected: {other:?}"),
    };
    assert_eq!(events.len(), MAX_BUFFERED_EVENTS);
    assert_eq!(events[0].data["content"], "m1");
    assert_eq!(events.last().unwrap().data["content"], "overflow");
}

#[test]
fn walph_remove_while_running_is_refused() {
    let s = stack();
    s.join(&["a1"]);
    for i in 0..5 {
        s.add_task("a1", &format!("t{i}"), 3);
    }
    s.executor.set_delay(std::time::Duration::from_millis(50));
    s.send(Command::WalphStart {
        agent: "a1".into(),
        preset: "drain".into(),
        max_iterations: Some(100),
    });

    let (kind, _) = expect_error(s.send(Command::WalphRemove {
        agent: "a1".into(),
    }));
    assert_eq!(kind, "walph_already_running");

    s.send(Command::WalphStop {
        agent: "a1".into(),
    });
    s.walph.join_agent("a1").unwrap();
    match s.send(Command::WalphRemove {
        agent: "a1".into(),
    }) {
        Response::Removed { removed } => assert!(removed),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn done_and_cancelled_are_terminal_forever() {
    let s = stack();
    s.join(&["a1"]);
    let task_id = s.add_task("a1", "t", 3);
    s.send(Command::Claim {
        agent: "a1".into(),
        task_id: task_id.clone(),
    });
    s.send(Command::Done {
        agent: "a1".into(),
        task_id: task_id.clone(),
        notes: None,
    });

    for target in ["claimed", "in_progress", "todo", "cancelled"] {
        let response = s.send(Command::Transition {
            agent: "a1".into(),
            task_id: task_id.clone(),
            to: target.into(),
        });
        assert!(
            matches!(response, Response::Error { .. }),
            "transition to {target} from done must fail"
        );
    }
}
