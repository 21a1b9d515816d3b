//! S5: walph pause/resume correctness.

use crate::prelude::*;
use masc_daemon::protocol::{Command, Response};
use std::time::Duration;

fn walph_status(s: &Stack, agent: &str) -> masc_engine::WalphStatus {
    match s.send(Command::WalphStatus {
        agent: agent.to_string(),
    }) {
        Response::Walph { status } => status,
        other => panic!("status failed: {other:?}"),
    }
}

#[test]
fn pause_stops_claims_resume_finishes_within_the_limit() {
    let s = stack();
    s.join(&["a1"]);
    for i in 0..3 {
        s.add_task("a1", &format!("t{i}"), 3);
    }
    // Slow executor so the pause lands mid-iteration
    s.executor.set_delay(Duration::from_millis(80));

    match s.send(Command::WalphStart {
        agent: "a1".into(),
        preset: "standard".into(),
        max_iterations: Some(5),
    }) {
        Response::Walph { status } => assert!(status.running),
        other => panic!("start failed: {other:?}"),
    }

    assert!(matches!(
        s.send(Command::WalphPause { agent: "a1".into() }),
        Response::Walph { .. }
    ));
    // Let the in-flight iteration finish and the loop park
    std::thread::sleep(Duration::from_millis(300));

    let status = walph_status(&s, "a1");
    assert!(status.running);
    assert!(status.paused);

    // No further claim_next happens while parked: executor call count
    // is frozen
    let calls_at_pause = s.executor.call_count();
    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(s.executor.call_count(), calls_at_pause);

    assert!(matches!(
        s.send(Command::WalphResume { agent: "a1".into() }),
        Response::Walph { .. }
    ));
    s.walph.join_agent("a1").unwrap();

    let status = walph_status(&s, "a1");
    assert!(!status.running);
    assert!(status.iterations <= 5);
    assert_eq!(status.completed, 3);
}

#[test]
fn drained_backlog_stops_the_loop_with_a_broadcast() {
    let s = stack();
    s.join(&["a1"]);
    s.add_task("a1", "only", 3);

    s.send(Command::WalphStart {
        agent: "a1".into(),
        preset: "drain".into(),
        max_iterations: Some(10),
    });
    s.walph.join_agent("a1").unwrap();

    let status = walph_status(&s, "a1");
    assert!(!status.running);
    assert_eq!(status.completed, 1);

    let page = s.engine.get_messages(0, 100).unwrap();
    assert!(page
        .messages
        .iter()
        .any(|m| m.content.contains("backlog drained")));
}

#[test]
fn swarm_status_reports_every_agent() {
    let s = stack();
    s.join(&["a1", "a2"]);
    s.send(Command::WalphStart {
        agent: "a1".into(),
        preset: "drain".into(),
        max_iterations: Some(1),
    });
    s.send(Command::WalphStart {
        agent: "a2".into(),
        preset: "drain".into(),
        max_iterations: Some(1),
    });
    s.walph.join_agent("a1").unwrap();
    s.walph.join_agent("a2").unwrap();

    match s.send(Command::SwarmStatus) {
        Response::Swarm { statuses } => {
            let agents: Vec<&str> = statuses.iter().map(|st| st.agent.as_str()).collect();
            assert_eq!(agents, vec!["a1", "a2"]);
        }
        other => panic!("unexpected: {other:?}"),
    }
}
