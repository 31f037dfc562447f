//! Top-level orchestration of the chat dock.
//!
//! [`DockingShell`] owns every piece of mutable dock state: the window
//! registry, the unseen-message detector, the poller, the audio gate and one
//! [`ChatWindowController`] per docked window. It runs as a single task that
//! interleaves user commands (from [`ShellHandle`]s) with poll results, so
//! there is exactly one writer and no locking of dock state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use chatdock_shared::reactions::ReactionGroup;
use chatdock_shared::{Conversation, ConversationId, CurrentUser, Message, MessageId};
use chatdock_store::KeyValueStore;

use crate::api::ChatApi;
use crate::audio::{GateState, NotificationAudioGate};
use crate::config::DockConfig;
use crate::detector::UnseenMessageDetector;
use crate::error::{ClientError, Result};
use crate::events::{emit_event, ShellEvent};
use crate::poller::{ConversationPoller, PollEvent, PollIntervals};
use crate::registry::OpenChatRegistry;
use crate::window::{ChatWindowController, SendOutcome};

const COMMAND_BUFFER: usize = 64;
const POLL_BUFFER: usize = 64;
const EVENT_BUFFER: usize = 256;

/// User actions routed to the shell.
#[derive(Debug)]
pub enum ShellCommand {
    /// First click or keypress; unlocks notification audio.
    UserGesture,
    Open {
        conversation_id: ConversationId,
        minimized: bool,
    },
    Close {
        conversation_id: ConversationId,
    },
    ToggleMinimize {
        conversation_id: ConversationId,
    },
    /// Replace a window's input text.
    Draft {
        conversation_id: ConversationId,
        text: String,
    },
    /// Send a window's current input.
    Submit {
        conversation_id: ConversationId,
    },
    React {
        conversation_id: ConversationId,
        message_id: MessageId,
        emoji: String,
    },
    OpenFullChat {
        conversation_id: Option<ConversationId>,
    },
    Snapshot {
        reply: oneshot::Sender<ShellSnapshot>,
    },
    Shutdown,
}

/// A conversation that is not docked, as listed in the inbox flyout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    pub conversation_id: ConversationId,
    pub name: String,
    pub preview: Option<String>,
    pub unread_count: u32,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// A message as rendered in a window, with its reactions grouped per emoji.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub reaction_groups: Vec<ReactionGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowView {
    pub conversation_id: ConversationId,
    pub title: String,
    pub is_minimized: bool,
    pub unread_count: u32,
    pub input: String,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellSnapshot {
    pub windows: Vec<WindowView>,
    pub inbox: Vec<InboxEntry>,
    pub total_unread: u32,
    pub audio_unlocked: bool,
}

/// Cloneable front door to a running [`DockingShell`].
#[derive(Clone)]
pub struct ShellHandle {
    commands: mpsc::Sender<ShellCommand>,
    events: broadcast::Sender<ShellEvent>,
}

impl ShellHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ShellEvent> {
        self.events.subscribe()
    }

    pub async fn send(&self, command: ShellCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| ClientError::ShellClosed)
    }

    pub async fn user_gesture(&self) -> Result<()> {
        self.send(ShellCommand::UserGesture).await
    }

    pub async fn open(&self, conversation_id: ConversationId, minimized: bool) -> Result<()> {
        self.send(ShellCommand::Open {
            conversation_id,
            minimized,
        })
        .await
    }

    pub async fn close(&self, conversation_id: ConversationId) -> Result<()> {
        self.send(ShellCommand::Close { conversation_id }).await
    }

    pub async fn toggle_minimize(&self, conversation_id: ConversationId) -> Result<()> {
        self.send(ShellCommand::ToggleMinimize { conversation_id })
            .await
    }

    /// Type `text` into a window and send it.
    pub async fn send_message(&self, conversation_id: ConversationId, text: String) -> Result<()> {
        self.send(ShellCommand::Draft {
            conversation_id: conversation_id.clone(),
            text,
        })
        .await?;
        self.send(ShellCommand::Submit { conversation_id }).await
    }

    pub async fn react(
        &self,
        conversation_id: ConversationId,
        message_id: MessageId,
        emoji: String,
    ) -> Result<()> {
        self.send(ShellCommand::React {
            conversation_id,
            message_id,
            emoji,
        })
        .await
    }

    pub async fn open_full_chat(&self, conversation_id: Option<ConversationId>) -> Result<()> {
        self.send(ShellCommand::OpenFullChat { conversation_id })
            .await
    }

    pub async fn snapshot(&self) -> Result<ShellSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(ShellCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| ClientError::ShellClosed)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(ShellCommand::Shutdown).await
    }
}

pub struct DockingShell {
    user: CurrentUser,
    api: Arc<dyn ChatApi>,
    registry: OpenChatRegistry,
    detector: UnseenMessageDetector,
    poller: ConversationPoller,
    gate: NotificationAudioGate,
    windows: HashMap<ConversationId, ChatWindowController>,
    conversations: Vec<Conversation>,
    events: broadcast::Sender<ShellEvent>,
    command_rx: Option<mpsc::Receiver<ShellCommand>>,
    poll_rx: Option<mpsc::Receiver<PollEvent>>,
}

impl DockingShell {
    /// Build a shell mounted now. Docked windows are restored from `store`.
    pub fn new(
        config: &DockConfig,
        user: CurrentUser,
        api: Arc<dyn ChatApi>,
        store: Arc<dyn KeyValueStore>,
        gate: NotificationAudioGate,
    ) -> (Self, ShellHandle) {
        Self::mounted_at(config, user, api, store, gate, Utc::now())
    }

    pub fn mounted_at(
        config: &DockConfig,
        user: CurrentUser,
        api: Arc<dyn ChatApi>,
        store: Arc<dyn KeyValueStore>,
        gate: NotificationAudioGate,
        mounted_at: DateTime<Utc>,
    ) -> (Self, ShellHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (poll_tx, poll_rx) = mpsc::channel(POLL_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let registry = OpenChatRegistry::load(store, config.max_open);
        let detector = UnseenMessageDetector::new(user.id.clone(), mounted_at, config.grace_period());
        let intervals = PollIntervals {
            conversations: config.conversation_poll,
            messages: config.message_poll,
        };
        let poller = ConversationPoller::new(api.clone(), intervals, poll_tx);

        let windows = registry
            .entries()
            .iter()
            .map(|e| {
                (
                    e.conversation_id.clone(),
                    ChatWindowController::new(e.conversation_id.clone(), user.clone(), e.is_minimized),
                )
            })
            .collect();

        let handle = ShellHandle {
            commands: command_tx,
            events: events.clone(),
        };

        let shell = Self {
            user,
            api,
            registry,
            detector,
            poller,
            gate,
            windows,
            conversations: Vec::new(),
            events,
            command_rx: Some(command_rx),
            poll_rx: Some(poll_rx),
        };
        (shell, handle)
    }

    /// Run until [`ShellCommand::Shutdown`] or until every handle is dropped.
    /// All polling stops when this returns.
    pub async fn run(mut self) {
        let (Some(mut commands), Some(mut polls)) = (self.command_rx.take(), self.poll_rx.take())
        else {
            warn!("docking shell started twice");
            return;
        };

        self.poller.start();
        self.poller.sync_windows(self.registry.entries());
        info!(
            user = %self.user.id,
            docked = self.registry.len(),
            max_open = self.registry.max_open(),
            "docking shell started"
        );

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(ShellCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = polls.recv() => self.handle_poll(event),
            }
        }

        self.poller.shutdown();
        info!("docking shell stopped");
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub fn registry(&self) -> &OpenChatRegistry {
        &self.registry
    }

    pub fn window(&self, id: &ConversationId) -> Option<&ChatWindowController> {
        self.windows.get(id)
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn audio_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn is_polling_messages(&self, id: &ConversationId) -> bool {
        self.poller.is_polling_messages(id)
    }

    pub async fn handle_command(&mut self, command: ShellCommand) {
        match command {
            ShellCommand::UserGesture => self.gate.unlock(),
            ShellCommand::Open {
                conversation_id,
                minimized,
            } => self.open_window(&conversation_id, minimized),
            ShellCommand::Close { conversation_id } => self.close_window(&conversation_id),
            ShellCommand::ToggleMinimize { conversation_id } => {
                self.toggle_minimize(&conversation_id)
            }
            ShellCommand::Draft {
                conversation_id,
                text,
            } => match self.windows.get_mut(&conversation_id) {
                Some(window) => window.set_input(text),
                None => debug!(conversation = %conversation_id, "draft for closed window dropped"),
            },
            ShellCommand::Submit { conversation_id } => self.submit(&conversation_id).await,
            ShellCommand::React {
                conversation_id,
                message_id,
                emoji,
            } => self.react(&conversation_id, &message_id, &emoji).await,
            ShellCommand::OpenFullChat { conversation_id } => {
                let route = self.user.role.chat_route().to_string();
                info!(route = %route, "opening full chat");
                emit_event(
                    &self.events,
                    ShellEvent::Navigate {
                        route,
                        conversation_id,
                    },
                );
            }
            ShellCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            ShellCommand::Shutdown => self.poller.shutdown(),
        }
    }

    pub fn handle_poll(&mut self, event: PollEvent) {
        match event {
            PollEvent::Conversations(list) => self.apply_conversations(list),
            PollEvent::Messages {
                conversation_id,
                messages,
            } => self.apply_messages(&conversation_id, messages),
        }
    }

    fn apply_conversations(&mut self, list: Vec<Conversation>) {
        let arrived = self.detector.observe(&list);
        self.conversations = list;

        for id in &arrived {
            // Forces minimized windows open so the new message is visible.
            self.open_window(id, false);
            self.announce(id);
        }

        emit_event(
            &self.events,
            ShellEvent::ConversationsUpdated {
                total_unread: self.total_unread(),
            },
        );
    }

    fn apply_messages(&mut self, id: &ConversationId, messages: Vec<Message>) {
        if self.registry.is_minimized(id) != Some(false) {
            debug!(conversation = %id, "discarding messages for hidden window");
            return;
        }
        let Some(window) = self.windows.get_mut(id) else {
            return;
        };

        let count = messages.len();
        let scroll = window.apply_messages(messages);

        emit_event(
            &self.events,
            ShellEvent::MessagesUpdated {
                conversation_id: id.clone(),
                count,
            },
        );
        if scroll {
            self.scroll_to_bottom(id);
        }
    }

    fn announce(&self, id: &ConversationId) {
        let conversation = self.conversations.iter().find(|c| &c.id == id);
        let title = conversation
            .map(|c| c.display_name(&self.user.id))
            .unwrap_or_else(|| id.to_string());
        let preview = conversation.and_then(Conversation::preview);

        info!(conversation = %id, title = %title, "new message");
        self.gate.play();
        emit_event(
            &self.events,
            ShellEvent::NewMessage {
                conversation_id: id.clone(),
                title,
                preview,
            },
        );
    }

    fn open_window(&mut self, id: &ConversationId, minimized: bool) {
        for evicted in self.registry.open(id, minimized) {
            debug!(conversation = %evicted, "window evicted");
            self.windows.remove(&evicted);
        }

        let user = self.user.clone();
        let window = self
            .windows
            .entry(id.clone())
            .or_insert_with(|| ChatWindowController::new(id.clone(), user, minimized));
        let scroll = window.set_minimized(minimized);

        self.layout_changed();
        if scroll {
            self.scroll_to_bottom(id);
        }
    }

    fn close_window(&mut self, id: &ConversationId) {
        self.registry.close(id);
        self.windows.remove(id);
        self.layout_changed();
    }

    fn toggle_minimize(&mut self, id: &ConversationId) {
        let Some(minimized) = self.registry.toggle_minimize(id) else {
            debug!(conversation = %id, "toggle for closed window ignored");
            return;
        };
        let scroll = self
            .windows
            .get_mut(id)
            .is_some_and(|w| w.set_minimized(minimized));

        self.layout_changed();
        if scroll {
            self.scroll_to_bottom(id);
        }
    }

    fn layout_changed(&mut self) {
        self.poller.sync_windows(self.registry.entries());
        emit_event(
            &self.events,
            ShellEvent::WindowsChanged {
                windows: self.registry.entries().to_vec(),
            },
        );
    }

    fn scroll_to_bottom(&self, id: &ConversationId) {
        emit_event(
            &self.events,
            ShellEvent::ScrollToBottom {
                conversation_id: id.clone(),
            },
        );
    }

    async fn submit(&mut self, id: &ConversationId) {
        let api = self.api.clone();
        let Some(window) = self.windows.get_mut(id) else {
            debug!(conversation = %id, "submit for closed window dropped");
            return;
        };

        let message = match window.send(api.as_ref(), &self.poller).await {
            Ok(SendOutcome::Sent(message)) => message,
            Ok(SendOutcome::Rejected) => return,
            Err(e) => {
                warn!(conversation = %id, error = %e, "send failed");
                return;
            }
        };
        let visible = !window.is_minimized();

        // Echo the confirmed message into the cached summary only. The
        // detector's watermark moves when a server poll reports the send,
        // so list results fetched before the send still compare equal.
        if let Some(conversation) = self.conversations.iter_mut().find(|c| &c.id == id) {
            conversation.last_message = Some(message.to_last_message());
        }

        emit_event(
            &self.events,
            ShellEvent::MessageSent {
                conversation_id: id.clone(),
                message_id: message.id,
            },
        );
        if visible {
            self.scroll_to_bottom(id);
        }
    }

    async fn react(&mut self, id: &ConversationId, message_id: &MessageId, emoji: &str) {
        let api = self.api.clone();
        let Some(window) = self.windows.get_mut(id) else {
            return;
        };

        match window
            .toggle_reaction(api.as_ref(), &self.poller, message_id, emoji)
            .await
        {
            Ok(Some(change)) => {
                debug!(conversation = %id, message = %message_id, emoji, ?change, "reaction toggled");
                let count = window.messages().len();
                emit_event(
                    &self.events,
                    ShellEvent::MessagesUpdated {
                        conversation_id: id.clone(),
                        count,
                    },
                );
            }
            Ok(None) => {}
            Err(e) => warn!(conversation = %id, message = %message_id, error = %e, "reaction failed"),
        }
    }

    /// Conversations that are not docked, newest activity first.
    pub fn inbox(&self) -> Vec<InboxEntry> {
        let mut entries: Vec<InboxEntry> = self
            .conversations
            .iter()
            .filter(|c| !self.registry.contains(&c.id))
            .map(|c| InboxEntry {
                conversation_id: c.id.clone(),
                name: c.display_name(&self.user.id),
                preview: c.preview(),
                unread_count: c.unread_count,
                last_message_at: c.last_message_at(),
            })
            .collect();

        // `None` sorts before `Some`, so reversing puts silent chats last.
        entries.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
        entries
    }

    pub fn total_unread(&self) -> u32 {
        self.conversations.iter().map(|c| c.unread_count).sum()
    }

    pub fn snapshot(&self) -> ShellSnapshot {
        let windows = self
            .registry
            .entries()
            .iter()
            .map(|entry| {
                let conversation = self
                    .conversations
                    .iter()
                    .find(|c| c.id == entry.conversation_id);
                let window = self.windows.get(&entry.conversation_id);
                WindowView {
                    conversation_id: entry.conversation_id.clone(),
                    title: conversation
                        .map(|c| c.display_name(&self.user.id))
                        .unwrap_or_else(|| entry.conversation_id.to_string()),
                    is_minimized: entry.is_minimized,
                    unread_count: conversation.map_or(0, |c| c.unread_count),
                    input: window.map(|w| w.input().to_string()).unwrap_or_default(),
                    messages: window
                        .map(|w| {
                            w.messages()
                                .iter()
                                .map(|m| MessageView {
                                    reaction_groups: m.reaction_groups(&self.user.id),
                                    message: m.clone(),
                                })
                                .collect()
                        })
                        .unwrap_or_default(),
                }
            })
            .collect();

        ShellSnapshot {
            windows,
            inbox: self.inbox(),
            total_unread: self.total_unread(),
            audio_unlocked: self.gate.state() == GateState::Unlocked,
        }
    }
}
