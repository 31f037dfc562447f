use chatdock_store::StoreError;
use thiserror::Error;

/// Errors produced by the docking engine's lower layers.
///
/// None of these escape the shell's event loop: transport, storage and
/// playback failures are logged and the engine carries on with stale data.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("Server responded {status} for {url}")]
    Status { status: u16, url: String },

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Durable storage failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The configured API base URL is unusable.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// The shell task has stopped and no longer accepts commands.
    #[error("Docking shell is not running")]
    ShellClosed,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
