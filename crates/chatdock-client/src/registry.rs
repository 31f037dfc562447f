//! Ordered, bounded list of docked chat windows.
//!
//! The registry is the single source of truth for "what is docked". Every
//! mutation mirrors the full list into durable storage under
//! [`OPEN_CHATS_KEY`]; on startup the list is rehydrated from there. Storage
//! problems never surface: unreadable state loads as an empty registry and
//! failed writes are logged and skipped.
//!
//! Only the docking shell mutates the registry, hence the crate-private
//! mutators.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use chatdock_shared::constants::OPEN_CHATS_KEY;
use chatdock_shared::ConversationId;
use chatdock_store::{load_json, save_json, KeyValueStore};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OpenChatEntry {
    pub conversation_id: ConversationId,
    pub is_minimized: bool,
}

pub struct OpenChatRegistry {
    entries: Vec<OpenChatEntry>,
    max_open: usize,
    store: Arc<dyn KeyValueStore>,
}

impl OpenChatRegistry {
    /// Rehydrate from `store`. Missing or corrupt data yields an empty
    /// registry. Duplicates are dropped and the list is trimmed to
    /// `max_open`, keeping the most recently opened entries.
    pub fn load(store: Arc<dyn KeyValueStore>, max_open: usize) -> Self {
        let saved = match load_json::<Vec<OpenChatEntry>>(store.as_ref(), OPEN_CHATS_KEY) {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "discarding unreadable docked window state");
                Vec::new()
            }
        };

        let mut registry = Self {
            entries: Vec::with_capacity(saved.len()),
            max_open: max_open.max(1),
            store,
        };
        for entry in saved {
            if !registry.contains(&entry.conversation_id) {
                registry.entries.push(entry);
            }
        }
        registry.evict_overflow();

        debug!(count = registry.entries.len(), "docked windows restored");
        registry
    }

    pub fn entries(&self) -> &[OpenChatEntry] {
        &self.entries
    }

    pub fn get(&self, id: &ConversationId) -> Option<&OpenChatEntry> {
        self.entries.iter().find(|e| &e.conversation_id == id)
    }

    pub fn contains(&self, id: &ConversationId) -> bool {
        self.get(id).is_some()
    }

    pub fn is_minimized(&self, id: &ConversationId) -> Option<bool> {
        self.get(id).map(|e| e.is_minimized)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_open(&self) -> usize {
        self.max_open
    }

    /// Dock `id`, or update its minimized flag in place if already docked.
    /// Returns the conversations evicted to stay within capacity, oldest
    /// first.
    pub(crate) fn open(&mut self, id: &ConversationId, minimized: bool) -> Vec<ConversationId> {
        let mut evicted = Vec::new();

        if let Some(entry) = self.entries.iter_mut().find(|e| &e.conversation_id == id) {
            entry.is_minimized = minimized;
        } else {
            self.entries.push(OpenChatEntry {
                conversation_id: id.clone(),
                is_minimized: minimized,
            });
            evicted = self.evict_overflow();
        }

        self.persist();
        evicted
    }

    /// Undock `id`. Returns whether it was docked.
    pub(crate) fn close(&mut self, id: &ConversationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| &e.conversation_id != id);
        self.persist();
        self.entries.len() != before
    }

    /// Flip the minimized flag. Returns the new flag, `None` if not docked.
    pub(crate) fn toggle_minimize(&mut self, id: &ConversationId) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|e| &e.conversation_id == id)?;
        entry.is_minimized = !entry.is_minimized;
        let minimized = entry.is_minimized;
        self.persist();
        Some(minimized)
    }

    fn evict_overflow(&mut self) -> Vec<ConversationId> {
        let overflow = self.entries.len().saturating_sub(self.max_open);
        self.entries
            .drain(..overflow)
            .map(|e| e.conversation_id)
            .collect()
    }

    fn persist(&self) {
        if let Err(e) = save_json(self.store.as_ref(), OPEN_CHATS_KEY, &self.entries) {
            warn!(error = %e, "failed to persist docked windows, continuing in memory");
        }
    }
}
