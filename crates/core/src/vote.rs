// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Votes: one ballot per agent, closing is final.

use crate::error::Error;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier for a vote, shaped `vote-<N>`.
    pub struct VoteId;
}

impl VoteId {
    pub fn from_index(n: u64) -> Self {
        Self(format!("vote-{n}"))
    }

    /// Numeric board index, if this id is well-formed.
    pub fn index(&self) -> Option<u64> {
        self.0.strip_prefix("vote-")?.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteState {
    Open,
    Closed,
}

/// A proposal with a fixed option list and a required ballot count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub vote_id: VoteId,
    pub proposer: String,
    pub topic: String,
    pub options: Vec<String>,
    pub required_votes: u32,
    /// agent name → chosen option, in ballot order
    #[serde(default)]
    pub ballots: IndexMap<String, String>,
    pub state: VoteState,
    /// Winning option, set exactly once at close
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(
        vote_id: VoteId,
        proposer: impl Into<String>,
        topic: impl Into<String>,
        options: Vec<String>,
        required_votes: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, Error> {
        if options.len() < 2 {
            return Err(Error::Schema {
                detail: "a vote needs at least two options".to_string(),
            });
        }
        if required_votes == 0 {
            return Err(Error::Schema {
                detail: "required_votes must be at least 1".to_string(),
            });
        }
        Ok(Self {
            vote_id,
            proposer: proposer.into(),
            topic: topic.into(),
            options,
            required_votes,
            ballots: IndexMap::new(),
            state: VoteState::Open,
            result: None,
            created_at,
        })
    }

    /// Record one ballot. Rejects closed votes, unknown options, and
    /// repeat voters.
    pub fn cast(&mut self, agent: &str, option: &str) -> Result<(), Error> {
        if self.state == VoteState::Closed {
            return Err(Error::VoteClosed {
                id: self.vote_id.to_string(),
            });
        }
        if !self.options.iter().any(|o| o == option) {
            return Err(Error::Schema {
                detail: format!("unknown option {option:?} for {}", self.vote_id),
            });
        }
        if self.ballots.contains_key(agent) {
            return Err(Error::AlreadyVoted {
                id: self.vote_id.to_string(),
                agent: agent.to_string(),
            });
        }
        self.ballots.insert(agent.to_string(), option.to_string());
        Ok(())
    }

    /// True once enough ballots are in to close.
    pub fn is_complete(&self) -> bool {
        self.ballots.len() as u32 >= self.required_votes
    }

    /// Plurality winner; ties break toward the earlier option.
    pub fn tally(&self) -> Option<String> {
        let mut best: Option<(usize, &String)> = None;
        for option in &self.options {
            let count = self.ballots.values().filter(|v| *v == option).count();
            match best {
                Some((n, _)) if n >= count => {}
                _ => best = Some((count, option)),
            }
        }
        best.map(|(_, option)| option.clone())
    }

    /// Close the vote and record the result. Closing is final.
    pub fn close(&mut self) {
        if self.state == VoteState::Open {
            self.result = self.tally();
            self.state = VoteState::Closed;
        }
    }
}

#[cfg(test)]
#[path = "vote_tests.rs"]
mod tests;
