//! Inbound message shapes and the audio jobs built from them

use crate::error::PlaybackError;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Text shown alongside an utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl DisplayText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            name: None,
            avatar: None,
        }
    }
}

/// Expression actions that accompany an utterance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Actions {
    #[serde(default)]
    pub expressions: Vec<serde_json::Value>,
}

/// Audio message as delivered by the transport
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundMessage {
    /// Base64-encoded audio
    pub audio: Option<String>,
    /// Per-slice amplitude, 0..1
    pub volumes: Option<Vec<f64>>,
    /// Milliseconds per slice
    pub slice_length: Option<f64>,
    pub display_text: Option<DisplayText>,
    pub timestamp: Option<f64>,
    pub actions: Option<Actions>,
    /// Relayed from another group member
    pub forwarded: bool,
}

/// Messages the session understands, tagged by `type`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SessionMessage {
    Audio(InboundMessage),
    BackendSynthComplete,
    Control { text: String },
    #[serde(other)]
    Unknown,
}

/// Where the audio for a job comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioPayload {
    Bytes(Bytes),
    Path(PathBuf),
    /// Base64 text exactly as received
    Encoded(String),
}

impl AudioPayload {
    /// Decoded audio bytes
    pub async fn load(&self) -> Result<Bytes, PlaybackError> {
        match self {
            AudioPayload::Bytes(bytes) => Ok(bytes.clone()),
            AudioPayload::Path(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| PlaybackError::Payload(format!("Failed to read {}: {}", path.display(), e))),
            AudioPayload::Encoded(text) => base64::engine::general_purpose::STANDARD
                .decode(text.trim())
                .map(Bytes::from)
                .map_err(|e| PlaybackError::Payload(format!("Invalid base64 audio: {}", e))),
        }
    }
}

/// One utterance waiting for, or undergoing, playback
#[derive(Debug, Clone, PartialEq)]
pub struct AudioJob {
    /// `None` for text-only utterances
    pub payload: Option<AudioPayload>,
    pub volume_track: Option<Vec<f64>>,
    pub slice_duration_ms: f64,
    pub display_text: Option<DisplayText>,
    pub actions: Option<Actions>,
    pub identity: Option<String>,
    pub forwarded: bool,
}

impl AudioJob {
    pub const DEFAULT_SLICE_MS: f64 = 20.0;

    pub fn new(payload: AudioPayload) -> Self {
        Self {
            payload: Some(payload),
            volume_track: None,
            slice_duration_ms: Self::DEFAULT_SLICE_MS,
            display_text: None,
            actions: None,
            identity: None,
            forwarded: false,
        }
    }

    /// A job that only shows text
    pub fn text_only(display_text: DisplayText) -> Self {
        Self {
            payload: None,
            volume_track: None,
            slice_duration_ms: Self::DEFAULT_SLICE_MS,
            display_text: Some(display_text),
            actions: None,
            identity: None,
            forwarded: false,
        }
    }

    pub fn with_volume_track(mut self, track: Vec<f64>, slice_duration_ms: f64) -> Self {
        self.volume_track = Some(track);
        self.slice_duration_ms = slice_duration_ms;
        self
    }

    pub fn with_display_text(mut self, display_text: DisplayText) -> Self {
        self.display_text = Some(display_text);
        self
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Build a job from a transport message. A missing or unusable slice
    /// length falls back to `default_slice_ms`.
    pub fn from_message(message: InboundMessage, default_slice_ms: f64, identity: Option<String>) -> Self {
        let slice_duration_ms = message
            .slice_length
            .filter(|ms| ms.is_finite() && *ms > 0.0)
            .unwrap_or(default_slice_ms);
        Self {
            payload: message.audio.map(AudioPayload::Encoded),
            volume_track: message.volumes.filter(|v| !v.is_empty()),
            slice_duration_ms,
            display_text: message.display_text,
            actions: message.actions,
            identity,
            forwarded: message.forwarded,
        }
    }

    /// Volume sample for a playback position, `None` once the position is
    /// past the end of the track
    pub fn volume_at(&self, position_ms: f64) -> Option<f64> {
        let track = self.volume_track.as_deref()?;
        let index = slice_index(position_ms, self.slice_duration_ms)?;
        track.get(index).copied()
    }
}

/// `floor(position / slice)`; `None` for negative or non-finite input
pub fn slice_index(position_ms: f64, slice_duration_ms: f64) -> Option<usize> {
    if !position_ms.is_finite() || position_ms < 0.0 || !(slice_duration_ms > 0.0) {
        return None;
    }
    let index = (position_ms / slice_duration_ms).floor();
    if index.is_finite() && index < usize::MAX as f64 {
        Some(index as usize)
    } else {
        None
    }
}
