//! Periodic refresh of conversation summaries and open windows' messages.
//!
//! One [`ScheduledTask`] fetches the conversation list; one more per docked,
//! non-minimized window fetches that conversation's messages. Results are
//! forwarded to the shell as [`PollEvent`]s. Failed fetches are logged and
//! otherwise ignored: the shell keeps its stale data until the next tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use chatdock_shared::{Conversation, ConversationId, Message};

use crate::api::ChatApi;
use crate::registry::OpenChatEntry;
use crate::scheduler::ScheduledTask;

#[derive(Debug, Clone)]
pub enum PollEvent {
    Conversations(Vec<Conversation>),
    Messages {
        conversation_id: ConversationId,
        messages: Vec<Message>,
    },
}

/// Forces cached server state to be refetched ahead of schedule.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate_conversations(&self);

    fn invalidate_messages(&self, conversation: &ConversationId);
}

#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    pub conversations: Duration,
    pub messages: Duration,
}

pub struct ConversationPoller {
    api: Arc<dyn ChatApi>,
    intervals: PollIntervals,
    tx: mpsc::Sender<PollEvent>,
    conversations: Option<ScheduledTask>,
    messages: HashMap<ConversationId, ScheduledTask>,
}

impl ConversationPoller {
    pub fn new(api: Arc<dyn ChatApi>, intervals: PollIntervals, tx: mpsc::Sender<PollEvent>) -> Self {
        Self {
            api,
            intervals,
            tx,
            conversations: None,
            messages: HashMap::new(),
        }
    }

    /// Start polling the conversation list. No-op if already running.
    pub fn start(&mut self) {
        if self.conversations.as_ref().is_some_and(ScheduledTask::is_running) {
            return;
        }

        let api = self.api.clone();
        let tx = self.tx.clone();
        self.conversations = Some(ScheduledTask::spawn(
            "conversations",
            self.intervals.conversations,
            move || {
                let api = api.clone();
                let tx = tx.clone();
                async move {
                    match api.list_conversations().await {
                        Ok(list) => {
                            let _ = tx.send(PollEvent::Conversations(list)).await;
                        }
                        Err(e) => warn!(error = %e, "conversation list fetch failed"),
                    }
                }
            },
        ));
        debug!("conversation polling started");
    }

    /// Align message polling with the docked windows: poll every
    /// non-minimized entry, stop everything else.
    pub fn sync_windows(&mut self, entries: &[OpenChatEntry]) {
        self.messages.retain(|id, _| {
            let keep = entries
                .iter()
                .any(|e| &e.conversation_id == id && !e.is_minimized);
            if !keep {
                debug!(conversation = %id, "message polling suspended");
            }
            keep
        });

        for entry in entries.iter().filter(|e| !e.is_minimized) {
            if !self.messages.contains_key(&entry.conversation_id) {
                let task = self.spawn_message_task(entry.conversation_id.clone());
                self.messages.insert(entry.conversation_id.clone(), task);
                debug!(conversation = %entry.conversation_id, "message polling started");
            }
        }
    }

    fn spawn_message_task(&self, conversation_id: ConversationId) -> ScheduledTask {
        let api = self.api.clone();
        let tx = self.tx.clone();
        let name = format!("messages:{conversation_id}");

        ScheduledTask::spawn(name, self.intervals.messages, move || {
            let api = api.clone();
            let tx = tx.clone();
            let conversation_id = conversation_id.clone();
            async move {
                match api.list_messages(&conversation_id).await {
                    Ok(messages) => {
                        let _ = tx
                            .send(PollEvent::Messages {
                                conversation_id,
                                messages,
                            })
                            .await;
                    }
                    Err(e) => {
                        warn!(conversation = %conversation_id, error = %e, "message fetch failed")
                    }
                }
            }
        })
    }

    pub fn is_polling_messages(&self, conversation: &ConversationId) -> bool {
        self.messages.contains_key(conversation)
    }

    /// Stop every task.
    pub fn shutdown(&mut self) {
        self.conversations = None;
        self.messages.clear();
        debug!("polling stopped");
    }
}

impl CacheInvalidator for ConversationPoller {
    fn invalidate_conversations(&self) {
        if let Some(task) = &self.conversations {
            task.trigger();
        }
    }

    fn invalidate_messages(&self, conversation: &ConversationId) {
        if let Some(task) = self.messages.get(conversation) {
            task.trigger();
        }
    }
}
