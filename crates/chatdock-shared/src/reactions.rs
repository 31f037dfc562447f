//! Per-user emoji reaction bookkeeping.
//!
//! A message carries a flat list of [`Reaction`]s. At most one entry exists
//! per `(user, emoji)` pair; toggling adds or removes that entry and never
//! duplicates it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::Reaction;
use crate::types::{CurrentUser, UserId};

/// What a toggle did to the reaction list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Removed,
}

/// Reactions for one emoji, aggregated for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionGroup {
    pub emoji: String,
    pub count: usize,
    pub users: Vec<String>,
    pub reacted_by_me: bool,
}

pub fn has_reacted(reactions: &[Reaction], user: &UserId, emoji: &str) -> bool {
    reactions
        .iter()
        .any(|r| &r.user_id == user && r.emoji == emoji)
}

/// Decide whether toggling `emoji` for `user` should add or remove it.
pub fn planned_change(reactions: &[Reaction], user: &UserId, emoji: &str) -> ReactionChange {
    if has_reacted(reactions, user, emoji) {
        ReactionChange::Removed
    } else {
        ReactionChange::Added
    }
}

/// Toggle `emoji` for `user` in place.
pub fn toggle_reaction(
    reactions: &mut Vec<Reaction>,
    user: &CurrentUser,
    emoji: &str,
    at: DateTime<Utc>,
) -> ReactionChange {
    apply_change(
        reactions,
        user,
        emoji,
        planned_change(reactions, &user.id, emoji),
        at,
    )
}

/// Apply an already-decided change. Adding is a no-op when the pair exists;
/// removing drops every entry for the pair.
pub fn apply_change(
    reactions: &mut Vec<Reaction>,
    user: &CurrentUser,
    emoji: &str,
    change: ReactionChange,
    at: DateTime<Utc>,
) -> ReactionChange {
    match change {
        ReactionChange::Removed => {
            reactions.retain(|r| !(r.user_id == user.id && r.emoji == emoji));
        }
        ReactionChange::Added => {
            if !has_reacted(reactions, &user.id, emoji) {
                reactions.push(Reaction {
                    emoji: emoji.to_string(),
                    user_id: user.id.clone(),
                    user_name: user.name.clone(),
                    created_at: at,
                });
            }
        }
    }
    change
}

/// Group reactions by emoji in order of first appearance.
///
/// Duplicate `(user, emoji)` entries are counted once. Groups with no users
/// are never produced.
pub fn summarize_reactions(reactions: &[Reaction], me: &UserId) -> Vec<ReactionGroup> {
    let mut groups: Vec<(ReactionGroup, Vec<&UserId>)> = Vec::new();

    for r in reactions {
        let idx = match groups.iter().position(|(g, _)| g.emoji == r.emoji) {
            Some(idx) => idx,
            None => {
                groups.push((
                    ReactionGroup {
                        emoji: r.emoji.clone(),
                        count: 0,
                        users: Vec::new(),
                        reacted_by_me: false,
                    },
                    Vec::new(),
                ));
                groups.len() - 1
            }
        };

        let (group, seen) = &mut groups[idx];
        if seen.contains(&&r.user_id) {
            continue;
        }
        seen.push(&r.user_id);
        group.count += 1;
        group.users.push(if r.user_name.is_empty() {
            r.user_id.to_string()
        } else {
            r.user_name.clone()
        });
        if &r.user_id == me {
            group.reacted_by_me = true;
        }
    }

    groups
        .into_iter()
        .map(|(g, _)| g)
        .filter(|g| g.count > 0)
        .collect()
}
