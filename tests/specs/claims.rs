//! S1: unique claim under contention.

use crate::prelude::*;
use masc_daemon::protocol::{Command, Response};
use masc_core::TaskStatus;

#[test]
fn three_agents_race_exactly_one_wins() {
    let s = stack();
    s.join(&["a1", "a2", "a3"]);
    let task_id = s.add_task("a1", "t1", 3);
    assert_eq!(task_id, "task-1");

    let mut handles = Vec::new();
    for agent in ["a1", "a2", "a3"] {
        let gate = std::sync::Arc::clone(&s.gate);
        let task_id = task_id.clone();
        handles.push(std::thread::spawn(move || {
            gate.dispatch(masc_daemon::protocol::Request::bare(Command::Claim {
                agent: agent.to_string(),
                task_id,
            }))
            .response
        }));
    }

    let mut winner: Option<String> = None;
    let mut claimed_errors = Vec::new();
    for handle in handles {
        match handle.join().unwrap() {
            Response::Task { task } => {
                assert!(winner.is_none(), "two claims succeeded");
                winner = Some(task.status.assignee().unwrap().to_string());
            }
            Response::Error { kind, message, .. } => {
                assert_eq!(kind, "task_claimed");
                claimed_errors.push(message);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    let winner = winner.expect("no claim succeeded");
    assert_eq!(claimed_errors.len(), 2);
    for message in &claimed_errors {
        assert!(
            message.contains(&winner),
            "loser error should name the winner: {message}"
        );
    }

    // The board agrees with the winner
    let task = s.engine.task(&"task-1".into()).unwrap();
    match task.status {
        TaskStatus::Claimed { assignee, .. } => assert_eq!(assignee, winner),
        other => panic!("task should be claimed, is {other:?}"),
    }
}

#[test]
fn claim_release_claim_ends_claimed_by_caller() {
    let s = stack();
    s.join(&["a1"]);
    let task_id = s.add_task("a1", "t1", 3);

    for command in [
        Command::Claim {
            agent: "a1".into(),
            task_id: task_id.clone(),
        },
        Command::Release {
            agent: "a1".into(),
            task_id: task_id.clone(),
        },
        Command::Claim {
            agent: "a1".into(),
            task_id: task_id.clone(),
        },
    ] {
        assert!(matches!(s.send(command), Response::Task { .. }));
    }

    let task = s.engine.task(&task_id.as_str().into()).unwrap();
    assert_eq!(task.status.assignee(), Some("a1"));
    assert_eq!(task.status.label(), "claimed");
}
