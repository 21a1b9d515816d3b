// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::test_helpers::room;
use masc_core::{Error, VoteState};

fn options() -> Vec<String> {
    vec!["rebase".to_string(), "merge".to_string()]
}

#[test]
fn create_cast_and_auto_close_at_quorum() {
    let t = room();
    t.join_all(&["a1", "a2", "a3"]);
    let vote = t
        .engine
        .vote_create("a1", "merge strategy", options(), 2)
        .unwrap();
    assert_eq!(vote.vote_id.as_str(), "vote-1");
    assert_eq!(vote.state, VoteState::Open);

    t.engine.vote_cast("a1", &vote.vote_id, "rebase").unwrap();
    let closed = t.engine.vote_cast("a2", &vote.vote_id, "rebase").unwrap();
    assert_eq!(closed.state, VoteState::Closed);
    assert_eq!(closed.result.as_deref(), Some("rebase"));

    // Ballots after close are rejected
    let err = t
        .engine
        .vote_cast("a3", &vote.vote_id, "merge")
        .unwrap_err();
    assert!(matches!(err, Error::VoteClosed { .. }));
}

#[test]
fn one_ballot_per_agent_is_enforced() {
    let t = room();
    t.join_all(&["a1", "a2"]);
    let vote = t.engine.vote_create("a1", "t", options(), 3).unwrap();
    t.engine.vote_cast("a1", &vote.vote_id, "rebase").unwrap();
    let err = t
        .engine
        .vote_cast("a1", &vote.vote_id, "merge")
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyVoted { .. }));
}

#[test]
fn proposer_may_close_early_others_may_not() {
    let t = room();
    t.join_all(&["a1", "a2"]);
    let vote = t.engine.vote_create("a1", "t", options(), 5).unwrap();
    t.engine.vote_cast("a2", &vote.vote_id, "merge").unwrap();

    let err = t.engine.vote_close("a2", &vote.vote_id).unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));

    let closed = t.engine.vote_close("a1", &vote.vote_id).unwrap();
    assert_eq!(closed.state, VoteState::Closed);
    assert_eq!(closed.result.as_deref(), Some("merge"));

    let err = t.engine.vote_close("a1", &vote.vote_id).unwrap_err();
    assert!(matches!(err, Error::VoteClosed { .. }));
}

#[test]
fn votes_status_lists_all_votes() {
    let t = room();
    t.join_all(&["a1"]);
    t.engine.vote_create("a1", "one", options(), 1).unwrap();
    t.engine.vote_create("a1", "two", options(), 1).unwrap();

    let votes = t.engine.votes_status().unwrap();
    assert_eq!(votes.len(), 2);
    assert_eq!(votes[0].topic, "one");
}

#[test]
fn unknown_vote_and_option_errors() {
    let t = room();
    t.join_all(&["a1"]);
    let err = t
        .engine
        .vote_cast("a1", &masc_core::VoteId::new("vote-9"), "x")
        .unwrap_err();
    assert!(matches!(err, Error::VoteNotFound { .. }));

    let vote = t.engine.vote_create("a1", "t", options(), 2).unwrap();
    let err = t
        .engine
        .vote_cast("a1", &vote.vote_id, "squash")
        .unwrap_err();
    assert!(matches!(err, Error::Schema { .. }));
}
