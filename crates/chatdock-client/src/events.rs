use serde::Serialize;
use tokio::sync::broadcast;

use chatdock_shared::{ConversationId, MessageId};

use crate::registry::OpenChatEntry;

pub const EVENT_WINDOWS_CHANGED: &str = "windows-changed";
pub const EVENT_CONVERSATIONS_UPDATED: &str = "conversations-updated";
pub const EVENT_MESSAGES_UPDATED: &str = "messages-updated";
pub const EVENT_SCROLL_TO_BOTTOM: &str = "scroll-to-bottom";
pub const EVENT_NEW_MESSAGE: &str = "new-message";
pub const EVENT_MESSAGE_SENT: &str = "message-sent";
pub const EVENT_NAVIGATE: &str = "navigate";

/// Everything a UI layer needs to re-render the dock. The `event` tag of
/// the serialized form is the same string [`ShellEvent::name`] returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ShellEvent {
    WindowsChanged {
        windows: Vec<OpenChatEntry>,
    },
    #[serde(rename_all = "camelCase")]
    ConversationsUpdated {
        total_unread: u32,
    },
    #[serde(rename_all = "camelCase")]
    MessagesUpdated {
        conversation_id: ConversationId,
        count: usize,
    },
    #[serde(rename_all = "camelCase")]
    ScrollToBottom {
        conversation_id: ConversationId,
    },
    #[serde(rename_all = "camelCase")]
    NewMessage {
        conversation_id: ConversationId,
        title: String,
        preview: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    MessageSent {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    #[serde(rename_all = "camelCase")]
    Navigate {
        route: String,
        conversation_id: Option<ConversationId>,
    },
}

impl ShellEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ShellEvent::WindowsChanged { .. } => EVENT_WINDOWS_CHANGED,
            ShellEvent::ConversationsUpdated { .. } => EVENT_CONVERSATIONS_UPDATED,
            ShellEvent::MessagesUpdated { .. } => EVENT_MESSAGES_UPDATED,
            ShellEvent::ScrollToBottom { .. } => EVENT_SCROLL_TO_BOTTOM,
            ShellEvent::NewMessage { .. } => EVENT_NEW_MESSAGE,
            ShellEvent::MessageSent { .. } => EVENT_MESSAGE_SENT,
            ShellEvent::Navigate { .. } => EVENT_NAVIGATE,
        }
    }
}

pub fn emit_event(events: &broadcast::Sender<ShellEvent>, event: ShellEvent) {
    let name = event.name();
    // Sending only fails when nobody is listening, which is fine.
    if events.send(event).is_err() {
        tracing::trace!(event = name, "no event subscribers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize_with_tag() {
        let event = ShellEvent::ScrollToBottom {
            conversation_id: ConversationId::new("c1"),
        };
        assert_eq!(event.name(), EVENT_SCROLL_TO_BOTTOM);
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({ "event": "scroll-to-bottom", "conversationId": "c1" })
        );
    }

    #[test]
    fn test_serialized_tag_matches_event_name() {
        let id = ConversationId::new("c1");
        let events = [
            ShellEvent::WindowsChanged { windows: vec![] },
            ShellEvent::ConversationsUpdated { total_unread: 0 },
            ShellEvent::MessagesUpdated {
                conversation_id: id.clone(),
                count: 0,
            },
            ShellEvent::ScrollToBottom {
                conversation_id: id.clone(),
            },
            ShellEvent::NewMessage {
                conversation_id: id.clone(),
                title: "Chat".into(),
                preview: None,
            },
            ShellEvent::MessageSent {
                conversation_id: id.clone(),
                message_id: MessageId::new("m1"),
            },
            ShellEvent::Navigate {
                route: "/chat".into(),
                conversation_id: None,
            },
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["event"], event.name());
        }
    }

    #[test]
    fn test_emitting_without_subscribers_is_harmless() {
        let (tx, _) = broadcast::channel(4);
        emit_event(&tx, ShellEvent::ConversationsUpdated { total_unread: 2 });

        let mut rx = tx.subscribe();
        emit_event(&tx, ShellEvent::ConversationsUpdated { total_unread: 3 });
        assert_eq!(
            rx.try_recv().unwrap(),
            ShellEvent::ConversationsUpdated { total_unread: 3 }
        );
    }
}
