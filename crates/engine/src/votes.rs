// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Vote lifecycle: create, cast, auto-close at quorum.

use crate::room::{keys, store_err, RoomEngine};
use masc_core::{Clock, Error, Vote, VoteId, VoteState};

impl<C: Clock> RoomEngine<C> {
    pub fn vote(&self, id: &VoteId) -> Result<Vote, Error> {
        self.get_json::<Vote>(&keys::vote(id))?
            .ok_or_else(|| Error::VoteNotFound { id: id.to_string() })
    }

    /// Open a vote. Ids come from the vote counter.
    pub fn vote_create(
        &self,
        proposer: &str,
        topic: &str,
        options: Vec<String>,
        required_votes: u32,
    ) -> Result<Vote, Error> {
        let room = self.room()?;
        self.ensure_unpaused(&room)?;
        self.require_active_agent(proposer)?;

        let index = self
            .backend
            .atomic_inc(keys::VOTE_SEQ, 1)
            .map_err(store_err)? as u64;
        let vote = Vote::new(
            VoteId::from_index(index),
            proposer,
            topic,
            options,
            required_votes,
            self.clock.now_utc(),
        )?;
        self.put_json(&keys::vote(&vote.vote_id), &vote)?;
        let _ = self.system_message(
            format!("{proposer} opened {} on {topic:?}", vote.vote_id),
            None,
        );
        Ok(vote)
    }

    /// Cast one ballot. The vote closes itself at quorum.
    pub fn vote_cast(&self, agent: &str, id: &VoteId, option: &str) -> Result<Vote, Error> {
        let room = self.room()?;
        self.ensure_unpaused(&room)?;
        self.require_active_agent(agent)?;

        let mut vote = self.vote(id)?;
        vote.cast(agent, option)?;
        if vote.is_complete() {
            vote.close();
        }
        self.put_json(&keys::vote(id), &vote)?;

        if vote.state == VoteState::Closed {
            let result = vote.result.clone().unwrap_or_default();
            let _ = self.system_message(format!("{id} closed: {result}"), None);
        }
        Ok(vote)
    }

    /// Early close by the proposer; tallies whatever ballots exist.
    pub fn vote_close(&self, agent: &str, id: &VoteId) -> Result<Vote, Error> {
        self.room()?;
        self.require_active_agent(agent)?;
        let mut vote = self.vote(id)?;

        if vote.state == VoteState::Closed {
            return Err(Error::VoteClosed { id: id.to_string() });
        }
        if vote.proposer != agent {
            return Err(Error::Forbidden {
                agent: agent.to_string(),
                action: format!("close {id}"),
            });
        }
        vote.close();
        self.put_json(&keys::vote(id), &vote)?;
        let result = vote.result.clone().unwrap_or_default();
        let _ = self.system_message(format!("{id} closed early: {result}"), None);
        Ok(vote)
    }

    /// All votes, board order.
    pub fn votes_status(&self) -> Result<Vec<Vote>, Error> {
        let mut votes = Vec::new();
        for key in self.backend.list(keys::VOTES).map_err(store_err)? {
            if let Some(vote) = self.get_json::<Vote>(&key)? {
                votes.push(vote);
            }
        }
        votes.sort_by_key(|v| v.vote_id.index().unwrap_or(u64::MAX));
        Ok(votes)
    }
}

#[cfg(test)]
#[path = "votes_tests.rs"]
mod tests;
