//! Error types for narayana-lipsync

use thiserror::Error;

/// A single parameter candidate could not be applied to the model.
///
/// Expected during probing; the adapter swallows these and moves on to the
/// next candidate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    #[error("Capability not present: {0}")]
    Unsupported(&'static str),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Model rejected write: {0}")]
    Rejected(String),
}

/// Audio engine errors. Always recovered by advancing the queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Failed to start playback: {0}")]
    Start(String),

    #[error("Engine error during playback: {0}")]
    Engine(String),

    #[error("Payload error: {0}")]
    Payload(String),
}

/// Lip-sync errors
#[derive(Error, Debug)]
pub enum LipSyncError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Message error: {0}")]
    Message(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
