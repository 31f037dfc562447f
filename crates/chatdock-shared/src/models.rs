//! Domain models returned by the host application's chat endpoints.
//!
//! Every struct derives `Serialize` and `Deserialize` with camelCase field
//! names so it maps one-to-one onto the REST payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{GROUP_CHAT_NAME, PREVIEW_MAX_CHARS, UNKNOWN_CHAT_NAME};
use crate::reactions::{summarize_reactions, ReactionGroup};
use crate::types::{ConversationId, MessageId, UserId};

// ---------------------------------------------------------------------------
// Member
// ---------------------------------------------------------------------------

/// A participant of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: UserId,
    #[serde(default)]
    pub name: String,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Summary of the most recent message of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub content: String,
    pub sender_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A conversation as listed by the server. Refreshed on every poll tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    /// Explicit name, if the conversation was given one.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    /// Server-computed unread count for the current user.
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    /// Explicit name, else "Group Chat" for multi-member conversations, else
    /// the other member's name.
    pub fn display_name(&self, me: &UserId) -> String {
        if let Some(name) = self.name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return name.to_string();
            }
        }

        if self.is_group || self.members.len() > 2 {
            return GROUP_CHAT_NAME.to_string();
        }

        self.members
            .iter()
            .find(|m| &m.id != me && !m.name.is_empty())
            .map(|m| m.name.clone())
            .unwrap_or_else(|| UNKNOWN_CHAT_NAME.to_string())
    }

    /// Single-line preview of the last message, shortened for the inbox.
    pub fn preview(&self) -> Option<String> {
        let last = self.last_message.as_ref()?;
        let flat = last.content.split_whitespace().collect::<Vec<_>>().join(" ");
        if flat.chars().count() <= PREVIEW_MAX_CHARS {
            return Some(flat);
        }
        let cut: String = flat.chars().take(PREVIEW_MAX_CHARS).collect();
        Some(format!("{}…", cut.trim_end()))
    }

    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.last_message.as_ref().map(|m| m.created_at)
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single emoji reaction left by one user on one message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub emoji: String,
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

/// A chat message inside a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    #[serde(default)]
    pub sender_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl Message {
    /// Reactions grouped per emoji, as rendered under the message bubble.
    pub fn reaction_groups(&self, me: &UserId) -> Vec<ReactionGroup> {
        summarize_reactions(&self.reactions, me)
    }

    pub fn to_last_message(&self) -> LastMessage {
        LastMessage {
            content: self.content.clone(),
            sender_id: self.sender_id.clone(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, name: &str) -> Member {
        Member {
            id: UserId::new(id),
            name: name.to_string(),
        }
    }

    fn conversation(name: Option<&str>, is_group: bool, members: Vec<Member>) -> Conversation {
        Conversation {
            id: ConversationId::new("c1"),
            name: name.map(str::to_string),
            is_group,
            members,
            last_message: None,
            unread_count: 0,
        }
    }

    #[test]
    fn test_display_name_prefers_explicit_name() {
        let c = conversation(Some("Closing team"), true, vec![]);
        assert_eq!(c.display_name(&UserId::new("me")), "Closing team");
    }

    #[test]
    fn test_display_name_for_groups() {
        let c = conversation(
            Some("  "),
            false,
            vec![member("me", "Me"), member("a", "Ann"), member("b", "Bob")],
        );
        assert_eq!(c.display_name(&UserId::new("me")), GROUP_CHAT_NAME);
    }

    #[test]
    fn test_display_name_for_direct_chat_is_other_member() {
        let c = conversation(None, false, vec![member("me", "Me"), member("a", "Ann")]);
        assert_eq!(c.display_name(&UserId::new("me")), "Ann");
    }

    #[test]
    fn test_preview_is_flattened_and_truncated() {
        let mut c = conversation(None, false, vec![]);
        assert!(c.preview().is_none());

        c.last_message = Some(LastMessage {
            content: format!("line one\nline two {}", "x".repeat(100)),
            sender_id: UserId::new("a"),
            created_at: Utc::now(),
        });
        let preview = c.preview().unwrap();
        assert!(preview.starts_with("line one line two"));
        assert!(preview.ends_with('…'));
        assert_eq!(preview.chars().count(), PREVIEW_MAX_CHARS + 1);
    }

    #[test]
    fn test_decodes_server_payload() {
        let json = r#"{
            "id": 7,
            "name": null,
            "isGroup": false,
            "members": [{"id": 1, "name": "Me"}, {"id": 2, "name": "Ann"}],
            "lastMessage": {"content": "hi", "senderId": 2, "createdAt": "2026-10-19T10:00:00Z"},
            "unreadCount": 3
        }"#;
        let c: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(c.id, ConversationId::new("7"));
        assert_eq!(c.unread_count, 3);
        assert_eq!(c.display_name(&UserId::new("1")), "Ann");
        assert_eq!(c.last_message.unwrap().sender_id, UserId::new("2"));
    }

    #[test]
    fn test_reaction_groups_for_message() {
        let reaction = |user: &str, emoji: &str| Reaction {
            emoji: emoji.to_string(),
            user_id: UserId::new(user),
            user_name: user.to_uppercase(),
            created_at: Utc::now(),
        };
        let message = Message {
            id: MessageId::new("m1"),
            sender_id: UserId::new("a"),
            sender_name: "A".into(),
            content: "hi".into(),
            created_at: Utc::now(),
            reactions: vec![reaction("a", "👍"), reaction("me", "🎉"), reaction("me", "👍")],
        };

        let groups = message.reaction_groups(&UserId::new("me"));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].emoji, "👍");
        assert_eq!(groups[0].count, 2);
        assert!(groups[0].reacted_by_me);
        assert_eq!(groups[1].emoji, "🎉");
        assert_eq!(groups[1].count, 1);
        assert!(!message.reaction_groups(&UserId::new("b"))[0].reacted_by_me);
    }
}
