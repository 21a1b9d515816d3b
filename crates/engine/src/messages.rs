// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message writes and seq-ordered reads.
//!
//! Every write allocates a seq with `atomic_inc`, then persists the
//! record. If the persist fails the seq is simply skipped; readers
//! tolerate the resulting gap, so the counter never needs a rollback.

use crate::cursor::{Cursor, CursorKind};
use crate::room::{keys, store_err, RoomEngine};
use masc_core::{Clock, Error, EventType, Message, MsgType, StreamEvent};
use serde_json::json;

/// Page of messages plus the cursor for the next page.
#[derive(Debug, Clone)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub next_cursor: Option<String>,
}

impl<C: Clock> RoomEngine<C> {
    /// Send a room-wide message. Returns the allocated seq.
    pub fn broadcast(
        &self,
        from: &str,
        content: &str,
        mention: Option<String>,
    ) -> Result<u64, Error> {
        let room = self.room()?;
        self.ensure_unpaused(&room)?;
        self.require_active_agent(from)?;

        let seq = self.write_message(from, MsgType::Broadcast, content, mention.clone())?;
        self.fabric.notify(&StreamEvent::new(
            EventType::Broadcast,
            from,
            json!({ "seq": seq, "content": content, "mention": mention }),
            self.clock.now_utc(),
        ));
        Ok(seq)
    }

    /// Room-authored message (task reverts, vote results, walph progress).
    pub fn system_message(&self, content: String, mention: Option<String>) -> Result<u64, Error> {
        self.write_message("room", MsgType::System, &content, mention)
    }

    /// Mirror a portal message into the ordered log.
    pub(crate) fn portal_message(
        &self,
        from: &str,
        to: &str,
        content: &str,
    ) -> Result<u64, Error> {
        self.write_message(from, MsgType::Portal, content, Some(to.to_string()))
    }

    pub(crate) fn write_message(
        &self,
        from: &str,
        msg_type: MsgType,
        content: &str,
        mention: Option<String>,
    ) -> Result<u64, Error> {
        let seq = self
            .backend
            .atomic_inc(keys::MESSAGE_SEQ, 1)
            .map_err(store_err)? as u64;

        let message = Message {
            seq,
            from_agent: from.to_string(),
            msg_type,
            content: content.to_string(),
            mention,
            timestamp: self.clock.now_utc(),
        };
        // A failure here abandons the seq; consumers tolerate the gap.
        self.put_json(&keys::message(seq), &message)?;

        self.bump_room_seq(seq);
        Ok(seq)
    }

    /// Keep `room.message_seq` at largest-persisted-plus-one. Best
    /// effort: the counter is authoritative, this field is a mirror.
    fn bump_room_seq(&self, seq: u64) {
        match self.room() {
            Ok(mut room) => {
                if room.message_seq <= seq {
                    room.message_seq = seq + 1;
                    if let Err(e) = self.save_room(&room) {
                        tracing::warn!(error = %e, "room seq mirror update failed");
                    }
                }
            }
            Err(Error::NotInitialized) => {}
            Err(e) => tracing::warn!(error = %e, "room read failed during seq bump"),
        }
    }

    /// Messages with `seq > since_seq`, ascending, at most `limit`.
    pub fn get_messages(&self, since_seq: u64, limit: usize) -> Result<MessagePage, Error> {
        self.room()?;
        let mut seqs: Vec<u64> = self
            .backend
            .list(keys::MESSAGES)
            .map_err(store_err)?
            .iter()
            .filter_map(|key| keys::message_seq(key))
            .filter(|seq| *seq > since_seq)
            .collect();
        seqs.sort_unstable();
        seqs.truncate(limit);

        let mut messages = Vec::with_capacity(seqs.len());
        for seq in &seqs {
            // A listed key can vanish under a concurrent reset; skip holes.
            if let Some(message) = self.get_json::<Message>(&keys::message(*seq))? {
                messages.push(message);
            }
        }

        let next_cursor = messages
            .last()
            .map(|m| Cursor::new(CursorKind::Messages, m.seq).encode());
        Ok(MessagePage {
            messages,
            next_cursor,
        })
    }

    /// Cursor-based continuation of [`RoomEngine::get_messages`].
    pub fn get_messages_after(&self, cursor: &str, limit: usize) -> Result<MessagePage, Error> {
        let cursor = Cursor::decode(cursor, CursorKind::Messages)?;
        self.get_messages(cursor.last, limit)
    }
}

#[cfg(test)]
#[path = "messages_tests.rs"]
mod tests;
