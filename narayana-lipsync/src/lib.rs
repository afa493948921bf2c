//! narayana-lipsync: audio-driven lip-sync for VTuber models
//!
//! Provides:
//! - Capability probing to find a working way to set mouth openness on an opaque model
//! - A perceptual volume to openness curve
//! - A serialized playback queue that samples playback position on a periodic tick
//! - Duplicate-delivery filtering for inbound audio messages

pub mod error;
pub mod config;
pub mod model;
pub mod strategy;
pub mod parameter;
pub mod driver;
pub mod message;
pub mod playback;
pub mod dedup;
pub mod session;

pub use error::{LipSyncError, PlaybackError, ProbeFailure};
pub use config::{CurveConfig, DedupConfig, LipSyncConfig, PlaybackConfig, DEFAULT_MOUTH_ALIASES};
pub use model::{AnimatableModel, InternalModel, LegacyModel, ModelSlot, ParameterSink, ParameterTable, RawParameterArray};
pub use strategy::{default_strategies, ParameterStrategy, StrategyKind};
pub use parameter::{ParameterAdapter, ParameterInput, ProbeStats, ResolvedStrategy};
pub use driver::{AnimationDriver, LipSyncCurve};
pub use message::{Actions, AudioJob, AudioPayload, DisplayText, InboundMessage, SessionMessage};
pub use playback::{AudioEngine, PlaybackEvent, PlaybackHandle, PlaybackQueue, PlaybackSnapshot, TextDisplaySink, TickHandle};
pub use dedup::{derive_identity, DedupFilter};
pub use session::LipSyncSession;
