//! Headless chat dock.
//!
//! Polls the host application and logs dock events. Commands are read from
//! stdin, one per line; the first line counts as the user gesture that
//! unlocks the notification chime.
//!
//! ```text
//! open <conversation>         dock a conversation
//! min <conversation>          toggle minimized
//! close <conversation>        undock
//! send <conversation> <text>  send a message
//! react <conversation> <message> <emoji>
//! inbox                       list undocked conversations
//! full [conversation]         open the full-page chat
//! quit
//! ```

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use chatdock_client::{
    init_tracing, CpalSink, DockConfig, DockingShell, HttpChatApi, NotificationAudioGate,
    ShellEvent, ShellHandle,
};
use chatdock_shared::constants::APP_NAME;
use chatdock_shared::{ConversationId, MessageId};
use chatdock_store::{KeyValueStore, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    info!("Starting {} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = DockConfig::from_env();
    info!(
        api = %config.api_url,
        max_open = config.max_open,
        grace_secs = config.grace_secs,
        user = %config.user_id,
        "Loaded configuration"
    );
    if config.user_id.is_empty() {
        anyhow::bail!("CHATDOCK_USER_ID must be set");
    }

    let api = Arc::new(HttpChatApi::new(&config).context("building HTTP client")?);
    let sqlite = match &config.store_path {
        Some(path) => SqliteStore::open_at(path),
        None => SqliteStore::open_default(),
    }
    .context("opening window layout store")?;
    let store: Arc<dyn KeyValueStore> = Arc::new(sqlite);
    let gate = NotificationAudioGate::new(Box::new(CpalSink::new()))
        .context("loading notification chime")?;

    let (shell, handle) = DockingShell::new(&config, config.current_user(), api, store, gate);
    let shell_task = shell.spawn();

    let mut events = handle.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(n)) => warn!(skipped = n, "event log lagging"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut gesture_seen = false;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !gesture_seen {
                    gesture_seen = true;
                    handle.user_gesture().await?;
                }
                if !dispatch(&handle, line.trim()).await? {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    handle.shutdown().await?;
    shell_task.await?;
    Ok(())
}

/// Returns `false` once the user asked to quit.
async fn dispatch(handle: &ShellHandle, line: &str) -> anyhow::Result<bool> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or_default().trim();

    match command {
        "" => {}
        "quit" | "exit" => return Ok(false),
        "open" if !rest.is_empty() => handle.open(ConversationId::new(rest), false).await?,
        "min" if !rest.is_empty() => handle.toggle_minimize(ConversationId::new(rest)).await?,
        "close" if !rest.is_empty() => handle.close(ConversationId::new(rest)).await?,
        "send" => match rest.split_once(char::is_whitespace) {
            Some((id, text)) => {
                handle
                    .send_message(ConversationId::new(id), text.to_string())
                    .await?
            }
            None => warn!("usage: send <conversation> <text>"),
        },
        "react" => {
            let args: Vec<&str> = rest.split_whitespace().collect();
            match args.as_slice() {
                [conversation, message, emoji] => {
                    handle
                        .react(
                            ConversationId::new(*conversation),
                            MessageId::new(*message),
                            emoji.to_string(),
                        )
                        .await?
                }
                _ => warn!("usage: react <conversation> <message> <emoji>"),
            }
        }
        "inbox" => {
            let snapshot = handle.snapshot().await?;
            info!(total_unread = snapshot.total_unread, "inbox");
            for entry in snapshot.inbox {
                info!(
                    conversation = %entry.conversation_id,
                    name = %entry.name,
                    unread = entry.unread_count,
                    preview = entry.preview.as_deref().unwrap_or(""),
                    "inbox entry"
                );
            }
        }
        "full" => {
            let id = (!rest.is_empty()).then(|| ConversationId::new(rest));
            handle.open_full_chat(id).await?
        }
        other => warn!(command = other, "unknown command"),
    }
    Ok(true)
}

fn log_event(event: &ShellEvent) {
    match serde_json::to_string(event) {
        Ok(json) => info!(event = event.name(), payload = %json, "dock event"),
        Err(e) => warn!(error = %e, "unserializable dock event"),
    }
}
