//! # chatdock-client
//!
//! Multi-window chat docking and notification engine.
//!
//! Keeps several conversations docked as floating windows, polls the host
//! application for new messages, opens and announces conversations when a
//! message from someone else arrives, persists the window layout across
//! restarts and forwards sends and reactions to the host's REST API.

pub mod api;
pub mod audio;
pub mod config;
pub mod detector;
pub mod events;
pub mod poller;
pub mod registry;
pub mod scheduler;
pub mod shell;
pub mod window;

mod error;

use tracing_subscriber::{fmt, EnvFilter};

pub use api::{ChatApi, HttpChatApi};
pub use audio::{AudioSink, CpalSink, NotificationAudioGate, NotificationClip};
pub use config::DockConfig;
pub use error::{ClientError, Result};
pub use events::ShellEvent;
pub use registry::{OpenChatEntry, OpenChatRegistry};
pub use shell::{DockingShell, ShellCommand, ShellHandle, ShellSnapshot};

/// Install the global `tracing` subscriber. Honours `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chatdock_client=debug,chatdock_store=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
