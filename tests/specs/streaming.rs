//! S3: subscription buffer eviction and one-shot polling.

use crate::prelude::*;
use masc_core::EventType;
use masc_daemon::protocol::{Command, Response};
use masc_engine::MAX_BUFFERED_EVENTS;

fn subscribe(s: &Stack, event_types: Vec<EventType>) -> String {
    match s.send(Command::Subscribe {
        agent_filter: None,
        event_types,
    }) {
        Response::Subscribed { subscription_id } => subscription_id,
        other => panic!("subscribe failed: {other:?}"),
    }
}

fn poll(s: &Stack, id: &str, clear: bool) -> Vec<masc_core::StreamEvent> {
    match s.send(Command::PollEvents {
        subscription_id: id.to_string(),
        clear,
    }) {
        Response::Events { events } => events,
        other => panic!("poll failed: {other:?}"),
    }
}

#[test]
fn one_hundred_fifty_broadcasts_keep_the_last_hundred() {
    let s = stack();
    s.join(&["a1"]);
    let sub = subscribe(&s, vec![EventType::Broadcast]);

    for i in 0..150 {
        assert!(matches!(
            s.send(Command::Broadcast {
                agent: "a1".into(),
                content: format!("m{i}"),
                mention: None,
            }),
            Response::Seq { .. }
        ));
    }

    let events = poll(&s, &sub, true);
    assert_eq!(events.len(), MAX_BUFFERED_EVENTS);
    // The last 100 by send order survive
    assert_eq!(events[0].data["content"], "m50");
    assert_eq!(events[99].data["content"], "m149");

    // clear=true emptied the buffer
    assert!(poll(&s, &sub, true).is_empty());
}

#[test]
fn filters_apply_before_buffering() {
    let s = stack();
    s.join(&["a1", "a2"]);
    let broadcasts_only = subscribe(&s, vec![EventType::Broadcast]);
    let completions_only = subscribe(&s, vec![EventType::Completion]);

    let task_id = s.add_task("a1", "t", 3);
    s.send(Command::Claim {
        agent: "a1".into(),
        task_id: task_id.clone(),
    });
    s.send(Command::Done {
        agent: "a1".into(),
        task_id,
        notes: None,
    });
    s.send(Command::Broadcast {
        agent: "a2".into(),
        content: "hi".into(),
        mention: None,
    });

    let broadcast_events = poll(&s, &broadcasts_only, true);
    assert_eq!(broadcast_events.len(), 1);
    assert_eq!(broadcast_events[0].agent, "a2");

    let completion_events = poll(&s, &completions_only, true);
    assert_eq!(completion_events.len(), 1);
    assert_eq!(completion_events[0].agent, "a1");
}

#[test]
fn resubscribe_gets_a_fresh_id_and_no_history() {
    let s = stack();
    s.join(&["a1"]);
    let first = subscribe(&s, vec![EventType::Broadcast]);
    s.send(Command::Broadcast {
        agent: "a1".into(),
        content: "before".into(),
        mention: None,
    });

    match s.send(Command::Unsubscribe {
        subscription_id: first.clone(),
    }) {
        Response::Unsubscribed { removed } => assert!(removed),
        other => panic!("unexpected: {other:?}"),
    }

    let second = subscribe(&s, vec![EventType::Broadcast]);
    assert_ne!(first, second);
    assert!(poll(&s, &second, true).is_empty());
}

#[tokio::test]
async fn live_clients_get_jsonrpc_notifications() {
    let s = stack();
    s.join(&["a1"]);
    let sub = subscribe(&s, vec![EventType::Broadcast]);
    let mut rx = s.fabric.attach_client(&sub.as_str().into()).unwrap();

    s.send(Command::Broadcast {
        agent: "a1".into(),
        content: "live".into(),
        mention: None,
    });

    let envelope = rx.recv().await.unwrap();
    assert_eq!(envelope["jsonrpc"], "2.0");
    assert_eq!(envelope["method"], "masc/event");
    assert_eq!(envelope["params"]["type"], "broadcast");
    assert_eq!(envelope["params"]["agent"], "a1");
    assert_eq!(envelope["params"]["subscription_id"], sub);
    assert!(envelope.get("id").is_none(), "notifications carry no id");
}

#[test]
fn poll_without_clear_retains_events() {
    let s = stack();
    s.join(&["a1"]);
    let sub = subscribe(&s, vec![EventType::Broadcast]);
    s.send(Command::Broadcast {
        agent: "a1".into(),
        content: "x".into(),
        mention: None,
    });

    assert_eq!(poll(&s, &sub, false).len(), 1);
    assert_eq!(poll(&s, &sub, false).len(), 1);
    assert_eq!(poll(&s, &sub, true).len(), 1);
    assert!(poll(&s, &sub, false).is_empty());
}
