//! S2: zombie GC reverts a stale claim.

use crate::prelude::*;
use masc_core::{AgentStatus, AuditEvent};
use masc_daemon::protocol::{Command, Response};
use std::time::Duration;

#[test]
fn stale_agent_is_evicted_and_its_claim_reverted() {
    let s = stack();
    s.join(&["a1"]);
    let task_id = s.add_task("a1", "t1", 3);
    assert!(matches!(
        s.send(Command::Claim {
            agent: "a1".into(),
            task_id: task_id.clone(),
        }),
        Response::Task { .. }
    ));

    // a1 stops heartbeating; advance past the threshold and sweep
    s.clock.advance(Duration::from_secs(301));
    let evicted = s
        .engine
        .sweep_zombies(Duration::from_secs(300))
        .unwrap();
    assert_eq!(evicted, vec!["a1".to_string()]);

    let task = s.engine.task(&task_id.as_str().into()).unwrap();
    assert_eq!(task.status.label(), "todo");
    assert_eq!(s.engine.agent("a1").unwrap().status, AgentStatus::Inactive);

    let audit = s.audit.records();
    assert!(audit.iter().any(|r| r.event
        == AuditEvent::AgentLeft {
            name: "a1".into(),
            reason: "zombie".into()
        }));
}

#[test]
fn heartbeats_keep_an_agent_alive_through_sweeps() {
    let s = stack();
    s.join(&["a1", "a2"]);

    // a1 heartbeats every 100s, a2 never does
    for _ in 0..4 {
        s.clock.advance(Duration::from_secs(100));
        assert!(matches!(
            s.send(Command::Heartbeat {
                agent: "a1".into(),
                status: None
            }),
            Response::Ok
        ));
    }

    let evicted = s
        .engine
        .sweep_zombies(Duration::from_secs(300))
        .unwrap();
    assert_eq!(evicted, vec!["a2".to_string()]);
    assert_eq!(s.engine.agent("a1").unwrap().status, AgentStatus::Active);
}

#[test]
fn any_command_counts_as_liveness() {
    let s = stack();
    s.join(&["a1"]);

    s.clock.advance(Duration::from_secs(200));
    // Not a heartbeat, but still a command from a1
    s.add_task("a1", "still here", 3);
    s.clock.advance(Duration::from_secs(200));

    // 400s since join, but only 200s since the last command
    let evicted = s
        .engine
        .sweep_zombies(Duration::from_secs(300))
        .unwrap();
    assert!(evicted.is_empty());
}
