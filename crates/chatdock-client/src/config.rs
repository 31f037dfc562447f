//! Engine configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the engine can start with zero
//! configuration against a local host application.

use std::path::PathBuf;
use std::time::Duration;

use chatdock_shared::constants::{
    DEFAULT_CONVERSATION_POLL_MS, DEFAULT_GRACE_SECS, DEFAULT_MAX_OPEN, DEFAULT_MESSAGE_POLL_MS,
    MAX_GRACE_SECS,
};
use chatdock_shared::{CurrentUser, Role};

/// Docking engine configuration.
#[derive(Debug, Clone)]
pub struct DockConfig {
    /// Base URL of the host application's REST API.
    /// Env: `CHATDOCK_API_URL`
    /// Default: `http://127.0.0.1:3000`
    pub api_url: String,

    /// Optional bearer token sent with every request.
    /// Env: `CHATDOCK_API_TOKEN`
    pub api_token: Option<String>,

    /// Maximum number of docked windows. Never below 1.
    /// Env: `CHATDOCK_MAX_OPEN`
    /// Default: `3`
    pub max_open: usize,

    /// How far before mount time a first-seen message still counts as new.
    /// Env: `CHATDOCK_GRACE_SECS`
    /// Default: `5`, at most one hour.
    pub grace_secs: i64,

    /// Conversation-list poll interval.
    /// Env: `CHATDOCK_CONVERSATION_POLL_MS`
    /// Default: 3 s
    pub conversation_poll: Duration,

    /// Per-window message-list poll interval.
    /// Env: `CHATDOCK_MESSAGE_POLL_MS`
    /// Default: 3 s
    pub message_poll: Duration,

    /// Timeout applied to every HTTP request.
    /// Env: `CHATDOCK_REQUEST_TIMEOUT_MS`
    /// Default: 10 s
    pub request_timeout: Duration,

    /// SQLite file holding the persisted window layout.
    /// Env: `CHATDOCK_STORE_PATH`
    /// Default: platform data directory.
    pub store_path: Option<PathBuf>,

    /// Identity of the signed-in user.
    /// Env: `CHATDOCK_USER_ID`, `CHATDOCK_USER_NAME`, `CHATDOCK_USER_ROLE`
    pub user_id: String,
    pub user_name: String,
    pub user_role: Role,
}

impl Default for DockConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:3000".to_string(),
            api_token: None,
            max_open: DEFAULT_MAX_OPEN,
            grace_secs: DEFAULT_GRACE_SECS,
            conversation_poll: Duration::from_millis(DEFAULT_CONVERSATION_POLL_MS),
            message_poll: Duration::from_millis(DEFAULT_MESSAGE_POLL_MS),
            request_timeout: Duration::from_secs(10),
            store_path: None,
            user_id: String::new(),
            user_name: String::new(),
            user_role: Role::Member,
        }
    }
}

impl DockConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("CHATDOCK_API_URL") {
            let url = url.trim().trim_end_matches('/').to_string();
            if !url.is_empty() {
                config.api_url = url;
            }
        }

        if let Some(token) = lookup("CHATDOCK_API_TOKEN") {
            if !token.is_empty() {
                config.api_token = Some(token);
            }
        }

        if let Some(val) = lookup("CHATDOCK_MAX_OPEN") {
            match val.parse::<usize>() {
                Ok(n) => config.max_open = n.max(1),
                Err(_) => tracing::warn!(value = %val, "Invalid CHATDOCK_MAX_OPEN, using default"),
            }
        }

        if let Some(val) = lookup("CHATDOCK_GRACE_SECS") {
            match val.parse::<i64>() {
                Ok(n) if (0..=MAX_GRACE_SECS).contains(&n) => config.grace_secs = n,
                _ => tracing::warn!(value = %val, "Invalid CHATDOCK_GRACE_SECS, using default"),
            }
        }

        if let Some(d) = parse_millis(&lookup, "CHATDOCK_CONVERSATION_POLL_MS") {
            config.conversation_poll = d;
        }
        if let Some(d) = parse_millis(&lookup, "CHATDOCK_MESSAGE_POLL_MS") {
            config.message_poll = d;
        }
        if let Some(d) = parse_millis(&lookup, "CHATDOCK_REQUEST_TIMEOUT_MS") {
            config.request_timeout = d;
        }

        if let Some(path) = lookup("CHATDOCK_STORE_PATH") {
            if !path.is_empty() {
                config.store_path = Some(PathBuf::from(path));
            }
        }

        if let Some(id) = lookup("CHATDOCK_USER_ID") {
            config.user_id = id.trim().to_string();
        }
        if let Some(name) = lookup("CHATDOCK_USER_NAME") {
            config.user_name = name;
        }
        if let Some(role) = lookup("CHATDOCK_USER_ROLE") {
            match role.parse::<Role>() {
                Ok(r) => config.user_role = r,
                Err(e) => tracing::warn!(error = %e, "Invalid CHATDOCK_USER_ROLE, using default"),
            }
        }

        config
    }

    pub fn grace_period(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.grace_secs.clamp(0, MAX_GRACE_SECS))
    }

    pub fn current_user(&self) -> CurrentUser {
        CurrentUser::new(self.user_id.clone(), self.user_name.clone(), self.user_role.clone())
    }
}

/// Poll intervals of zero are rejected: `tokio::time::interval` panics on them.
fn parse_millis<F>(lookup: &F, key: &str) -> Option<Duration>
where
    F: Fn(&str) -> Option<String>,
{
    let val = lookup(key)?;
    match val.parse::<u64>() {
        Ok(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            tracing::warn!(key, value = %val, "Invalid duration, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = DockConfig::default();
        assert_eq!(config.max_open, 3);
        assert_eq!(config.grace_secs, 5);
        assert_eq!(config.conversation_poll, Duration::from_secs(3));
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = DockConfig::from_lookup(lookup_from(&[
            ("CHATDOCK_API_URL", "https://crm.example.com/"),
            ("CHATDOCK_MAX_OPEN", "4"),
            ("CHATDOCK_MESSAGE_POLL_MS", "1500"),
            ("CHATDOCK_USER_ID", " 17 "),
            ("CHATDOCK_USER_ROLE", "admin"),
        ]));
        assert_eq!(config.api_url, "https://crm.example.com");
        assert_eq!(config.max_open, 4);
        assert_eq!(config.message_poll, Duration::from_millis(1500));
        assert_eq!(config.current_user().id.as_str(), "17");
        assert_eq!(config.user_role, Role::Admin);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = DockConfig::from_lookup(lookup_from(&[
            ("CHATDOCK_MAX_OPEN", "many"),
            ("CHATDOCK_GRACE_SECS", "-3"),
            ("CHATDOCK_CONVERSATION_POLL_MS", "0"),
            ("CHATDOCK_USER_ROLE", "pilot"),
        ]));
        assert_eq!(config.max_open, 3);
        assert_eq!(config.grace_secs, 5);
        assert_eq!(config.conversation_poll, Duration::from_secs(3));
        assert_eq!(config.user_role, Role::Member);
    }

    #[test]
    fn test_max_open_is_at_least_one() {
        let config = DockConfig::from_lookup(lookup_from(&[("CHATDOCK_MAX_OPEN", "0")]));
        assert_eq!(config.max_open, 1);
    }

    #[test]
    fn test_oversized_grace_window_keeps_default() {
        let config = DockConfig::from_lookup(lookup_from(&[(
            "CHATDOCK_GRACE_SECS",
            "9223372036854775807",
        )]));
        assert_eq!(config.grace_secs, 5);
        assert_eq!(config.grace_period(), chrono::Duration::seconds(5));

        let config = DockConfig::from_lookup(lookup_from(&[("CHATDOCK_GRACE_SECS", "3600")]));
        assert_eq!(config.grace_period(), chrono::Duration::hours(1));
    }

    #[test]
    fn test_grace_period_is_bounded_when_set_directly() {
        let config = DockConfig {
            grace_secs: i64::MAX,
            ..DockConfig::default()
        };
        assert_eq!(config.grace_period(), chrono::Duration::seconds(MAX_GRACE_SECS));

        let config = DockConfig {
            grace_secs: -10,
            ..DockConfig::default()
        };
        assert_eq!(config.grace_period(), chrono::Duration::zero());
    }
}
