//! View-model of one docked chat window.

use chrono::Utc;
use tracing::{debug, info};

use chatdock_shared::reactions::{apply_change, planned_change, ReactionChange};
use chatdock_shared::{ConversationId, CurrentUser, Message, MessageId};

use crate::api::ChatApi;
use crate::error::Result;
use crate::poller::CacheInvalidator;

/// Result of a send attempt that did not fail at the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The server accepted the message.
    Sent(Message),
    /// Nothing but whitespace in the input. No request was made.
    Rejected,
}

pub struct ChatWindowController {
    conversation_id: ConversationId,
    user: CurrentUser,
    input: String,
    messages: Vec<Message>,
    minimized: bool,
}

impl ChatWindowController {
    pub fn new(conversation_id: ConversationId, user: CurrentUser, minimized: bool) -> Self {
        Self {
            conversation_id,
            user,
            input: String::new(),
            messages: Vec::new(),
            minimized,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_minimized(&self) -> bool {
        self.minimized
    }

    /// Returns `true` when the view should scroll to the newest message,
    /// i.e. the window was just restored and has something to show.
    pub fn set_minimized(&mut self, minimized: bool) -> bool {
        let restored = self.minimized && !minimized;
        self.minimized = minimized;
        restored && !self.messages.is_empty()
    }

    /// Replace the message list with a fresh server copy. Returns `true`
    /// when a new message appeared and the window is visible, meaning the
    /// view should scroll to the bottom.
    pub fn apply_messages(&mut self, messages: Vec<Message>) -> bool {
        let previous_newest = self.messages.last().map(|m| m.id.clone());
        let newest = messages.last().map(|m| m.id.clone());
        let grew = newest.is_some() && newest != previous_newest;

        self.messages = messages;
        grew && !self.minimized
    }

    /// Send the current input. The input is cleared only once the server
    /// has accepted the message; on failure it is left as typed.
    pub async fn send(
        &mut self,
        api: &dyn ChatApi,
        cache: &dyn CacheInvalidator,
    ) -> Result<SendOutcome> {
        let content = self.input.trim();
        if content.is_empty() {
            debug!(conversation = %self.conversation_id, "ignoring empty message");
            return Ok(SendOutcome::Rejected);
        }

        let message = api.send_message(&self.conversation_id, content).await?;
        info!(conversation = %self.conversation_id, message = %message.id, "message sent");

        self.input.clear();
        if !self.messages.iter().any(|m| m.id == message.id) {
            self.messages.push(message.clone());
        }

        cache.invalidate_messages(&self.conversation_id);
        cache.invalidate_conversations();
        Ok(SendOutcome::Sent(message))
    }

    /// Toggle the current user's `emoji` reaction on `message_id`.
    ///
    /// Returns `None` when the message is not in this window or the emoji is
    /// blank. On success the server's copy of the message replaces ours.
    pub async fn toggle_reaction(
        &mut self,
        api: &dyn ChatApi,
        cache: &dyn CacheInvalidator,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<Option<ReactionChange>> {
        let emoji = emoji.trim();
        if emoji.is_empty() {
            return Ok(None);
        }
        let Some(idx) = self.messages.iter().position(|m| &m.id == message_id) else {
            debug!(conversation = %self.conversation_id, message = %message_id, "reaction target not loaded");
            return Ok(None);
        };

        let change = planned_change(&self.messages[idx].reactions, &self.user.id, emoji);
        let updated = match change {
            ReactionChange::Added => api.add_reaction(message_id, emoji).await?,
            ReactionChange::Removed => api.remove_reaction(message_id, emoji).await?,
        };

        // The list may have been replaced while the request was in flight.
        match self.messages.iter_mut().find(|m| &m.id == message_id) {
            Some(slot) if updated.id == *message_id => *slot = updated,
            Some(slot) => {
                apply_change(&mut slot.reactions, &self.user, emoji, change, Utc::now());
            }
            None => {}
        }

        cache.invalidate_messages(&self.conversation_id);
        Ok(Some(change))
    }
}
