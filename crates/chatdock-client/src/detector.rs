//! Decides when a conversation's last message is new to the user.
//!
//! Each conversation carries a watermark: the timestamp of the last message
//! already accounted for. Watermarks live in memory only and are compared by
//! exact equality, never by ordering, so a re-delivered message with an
//! unchanged timestamp does not fire again.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use chatdock_shared::{Conversation, ConversationId, UserId};

pub struct UnseenMessageDetector {
    current_user: UserId,
    mounted_at: DateTime<Utc>,
    grace: Duration,
    watermarks: HashMap<ConversationId, DateTime<Utc>>,
}

impl UnseenMessageDetector {
    pub fn new(current_user: UserId, mounted_at: DateTime<Utc>, grace: Duration) -> Self {
        Self {
            current_user,
            mounted_at,
            grace,
            watermarks: HashMap::new(),
        }
    }

    /// Process one poll tick. Returns the conversations whose last message
    /// just arrived from someone else, in server order. Each returned id
    /// should be opened and announced exactly once.
    pub fn observe(&mut self, conversations: &[Conversation]) -> Vec<ConversationId> {
        let mut arrived = Vec::new();

        for conversation in conversations {
            let Some(last) = conversation.last_message.as_ref() else {
                continue;
            };
            let from_other = last.sender_id != self.current_user;

            match self.watermarks.insert(conversation.id.clone(), last.created_at) {
                None => {
                    // First sighting: only messages stamped inside the grace
                    // window (or after mount) count as fresh.
                    if from_other && last.created_at >= self.mounted_at - self.grace {
                        debug!(conversation = %conversation.id, "message arrived around mount");
                        arrived.push(conversation.id.clone());
                    }
                }
                Some(previous) if previous != last.created_at => {
                    if from_other {
                        debug!(conversation = %conversation.id, "new message detected");
                        arrived.push(conversation.id.clone());
                    }
                }
                Some(_) => {}
            }
        }

        arrived
    }

    /// Timestamp of the last message already accounted for.
    pub fn watermark(&self, id: &ConversationId) -> Option<DateTime<Utc>> {
        self.watermarks.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatdock_shared::LastMessage;

    const ME: &str = "me";

    fn conversation(id: &str, sender: &str, at: DateTime<Utc>) -> Conversation {
        Conversation {
            id: ConversationId::new(id),
            name: None,
            is_group: false,
            members: vec![],
            last_message: Some(LastMessage {
                content: "hello".into(),
                sender_id: UserId::new(sender),
                created_at: at,
            }),
            unread_count: 1,
        }
    }

    fn detector(mounted_at: DateTime<Utc>) -> UnseenMessageDetector {
        UnseenMessageDetector::new(UserId::new(ME), mounted_at, Duration::seconds(5))
    }

    #[test]
    fn test_first_sighting_inside_grace_window_fires() {
        let t = Utc::now();
        let mut d = detector(t);
        let x = conversation("X", "ann", t - Duration::seconds(2));
        assert_eq!(d.observe(&[x]), vec![ConversationId::new("X")]);
    }

    #[test]
    fn test_first_sighting_outside_grace_window_is_silent() {
        let t = Utc::now();
        let mut d = detector(t);
        let x = conversation("X", "ann", t - Duration::seconds(30));
        assert!(d.observe(&[x]).is_empty());
        assert_eq!(
            d.watermark(&ConversationId::new("X")),
            Some(t - Duration::seconds(30))
        );
    }

    #[test]
    fn test_own_message_inside_grace_window_is_silent() {
        let t = Utc::now();
        let mut d = detector(t);
        assert!(d.observe(&[conversation("X", ME, t)]).is_empty());
    }

    #[test]
    fn test_new_timestamp_fires_once() {
        let t = Utc::now();
        let mut d = detector(t);
        d.observe(&[conversation("X", "ann", t - Duration::minutes(10))]);

        let newer = conversation("X", "ann", t + Duration::seconds(40));
        assert_eq!(d.observe(&[newer.clone()]).len(), 1);
        assert!(d.observe(&[newer.clone()]).is_empty());
        assert!(d.observe(&[newer]).is_empty());
    }

    #[test]
    fn test_own_new_message_advances_silently() {
        let t = Utc::now();
        let mut d = detector(t);
        d.observe(&[conversation("X", "ann", t - Duration::minutes(10))]);

        let mine = t + Duration::seconds(20);
        assert!(d.observe(&[conversation("X", ME, mine)]).is_empty());
        assert_eq!(d.watermark(&ConversationId::new("X")), Some(mine));

        // A reply after our own message is still detected.
        let reply = conversation("X", "ann", mine + Duration::seconds(1));
        assert_eq!(d.observe(&[reply]).len(), 1);
    }

    #[test]
    fn test_comparison_is_by_equality_not_order() {
        let t = Utc::now();
        let mut d = detector(t);
        d.observe(&[conversation("X", "ann", t - Duration::minutes(1))]);

        // An older timestamp (e.g. the newest message was deleted) still differs.
        let older = conversation("X", "ann", t - Duration::minutes(2));
        assert_eq!(d.observe(&[older]).len(), 1);
    }

    #[test]
    fn test_empty_conversations_never_seed() {
        let t = Utc::now();
        let mut d = detector(t);
        let mut empty = conversation("X", "ann", t);
        empty.last_message = None;
        assert!(d.observe(&[empty]).is_empty());
        assert_eq!(d.watermark(&ConversationId::new("X")), None);
    }

    #[test]
    fn test_arrivals_follow_server_order() {
        let t = Utc::now();
        let mut d = detector(t);
        let list = [
            conversation("B", "ann", t),
            conversation("A", "bob", t),
            conversation("C", ME, t),
        ];
        assert_eq!(
            d.observe(&list),
            vec![ConversationId::new("B"), ConversationId::new("A")]
        );
    }
}
