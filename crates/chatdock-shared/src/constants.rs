/// Application name
pub const APP_NAME: &str = "chatdock";

/// Default maximum number of simultaneously docked chat windows
pub const DEFAULT_MAX_OPEN: usize = 3;

/// Default grace window around mount time, in seconds
pub const DEFAULT_GRACE_SECS: i64 = 5;

/// Upper bound for a configured grace window, in seconds
pub const MAX_GRACE_SECS: i64 = 3_600;

/// Default conversation-list poll interval in milliseconds
pub const DEFAULT_CONVERSATION_POLL_MS: u64 = 3_000;

/// Default per-window message-list poll interval in milliseconds
pub const DEFAULT_MESSAGE_POLL_MS: u64 = 3_000;

/// Storage key under which the docked window list is persisted
pub const OPEN_CHATS_KEY: &str = "chatdock.open_chats";

/// Display name for unnamed multi-member conversations
pub const GROUP_CHAT_NAME: &str = "Group Chat";

/// Fallback display name when no other member is known
pub const UNKNOWN_CHAT_NAME: &str = "Chat";

/// Maximum characters of a last-message preview shown in the inbox
pub const PREVIEW_MAX_CHARS: usize = 60;
