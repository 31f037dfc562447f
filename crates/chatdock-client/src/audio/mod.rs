//! New-message chime, gated behind a user gesture.
//!
//! Playback environments commonly refuse to start audio until the user has
//! interacted with the application. [`NotificationAudioGate`] models that
//! rule: [`unlock`](NotificationAudioGate::unlock) is called from the first
//! click or keypress and performs a silent trial playback, after which
//! [`play`](NotificationAudioGate::play) actually sounds the chime.

mod decode;
mod output;

use thiserror::Error;
use tracing::{debug, info};

pub use output::CpalSink;

static EMBEDDED_CHIME: &[u8] = include_bytes!("../../assets/notification.wav");

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No output device available")]
    NoOutputDevice,

    #[error("Playback denied: {0}")]
    Denied(String),

    #[error("Audio device error: {0}")]
    DeviceError(String),

    #[error("Audio stream error: {0}")]
    StreamError(String),

    #[error("Audio decode error: {0}")]
    DecodeError(String),

    #[error("Invalid audio clip: {0}")]
    InvalidClip(&'static str),
}

/// A short RIFF/WAVE clip compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct NotificationClip {
    bytes: &'static [u8],
}

impl NotificationClip {
    pub fn from_static(bytes: &'static [u8]) -> Result<Self, AudioError> {
        if bytes.len() < 44 {
            return Err(AudioError::InvalidClip("shorter than a WAV header"));
        }
        if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(AudioError::InvalidClip("missing RIFF/WAVE signature"));
        }
        Ok(Self { bytes })
    }

    /// The chime shipped with the crate.
    pub fn embedded() -> Result<Self, AudioError> {
        Self::from_static(EMBEDDED_CHIME)
    }

    pub fn bytes(&self) -> &'static [u8] {
        self.bytes
    }
}

/// Output device able to play a [`NotificationClip`].
pub trait AudioSink: Send + Sync {
    /// Start playing `clip` from its current position.
    fn start(&self, clip: &NotificationClip) -> Result<(), AudioError>;

    /// Pause playback and rewind to the beginning.
    fn stop(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No user gesture seen yet.
    Locked,
    /// Trial playback succeeded; `play` sounds the chime.
    Unlocked,
    /// Trial playback was refused. `play` stays silent for the session.
    Denied,
}

pub struct NotificationAudioGate {
    sink: Box<dyn AudioSink>,
    clip: NotificationClip,
    state: GateState,
}

impl NotificationAudioGate {
    /// Gate over the embedded chime.
    pub fn new(sink: Box<dyn AudioSink>) -> Result<Self, AudioError> {
        Ok(Self::with_clip(sink, NotificationClip::embedded()?))
    }

    pub fn with_clip(sink: Box<dyn AudioSink>, clip: NotificationClip) -> Self {
        Self {
            sink,
            clip,
            state: GateState::Locked,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Call once from a user gesture. Only the first call has any effect.
    pub fn unlock(&mut self) {
        if self.state != GateState::Locked {
            return;
        }

        match self.sink.start(&self.clip) {
            Ok(()) => {
                self.sink.stop();
                self.state = GateState::Unlocked;
                info!("notification audio unlocked");
            }
            Err(e) => {
                self.state = GateState::Denied;
                debug!(error = %e, "notification audio denied, chime disabled");
            }
        }
    }

    /// Sound the chime from the start. Never fails; a no-op until unlocked.
    pub fn play(&self) {
        if self.state != GateState::Unlocked {
            return;
        }

        self.sink.stop();
        if let Err(e) = self.sink.start(&self.clip) {
            debug!(error = %e, "notification chime failed");
        }
    }
}
