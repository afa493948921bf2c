//! Session facade wiring inbound messages to playback

use crate::config::LipSyncConfig;
use crate::dedup::{derive_identity, DedupFilter};
use crate::driver::{AnimationDriver, LipSyncCurve};
use crate::error::LipSyncError;
use crate::message::{AudioJob, InboundMessage, SessionMessage};
use crate::model::{AnimatableModel, ModelSlot};
use crate::parameter::ParameterAdapter;
use crate::playback::{AudioEngine, PlaybackEvent, PlaybackQueue, TextDisplaySink};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Control text that cancels playback
const INTERRUPT_COMMAND: &str = "interrupt";

/// One lip-sync session: dedup, queue and the active model
pub struct LipSyncSession {
    config: LipSyncConfig,
    dedup: Mutex<DedupFilter>,
    queue: PlaybackQueue,
}

impl LipSyncSession {
    /// Create a session. Must be called from within a tokio runtime; playback
    /// tasks are spawned on that runtime, so the message handlers can be
    /// called from any thread afterwards.
    pub fn new(config: LipSyncConfig, engine: Arc<dyn AudioEngine>) -> Result<Self, LipSyncError> {
        config.validate().map_err(LipSyncError::Config)?;
        let runtime = Handle::try_current().map_err(|e| LipSyncError::Runtime(e.to_string()))?;

        let adapter = ParameterAdapter::new(config.parameter_aliases.clone());
        let driver = AnimationDriver::new(adapter, LipSyncCurve::from(config.curve));
        let queue = PlaybackQueue::new(engine, driver, ModelSlot::default(), config.playback.clone(), runtime);
        let dedup = Mutex::new(DedupFilter::new(&config.dedup));

        info!(
            "Lip-sync session created ({} parameter aliases, tick {} ms)",
            config.parameter_aliases.len(),
            config.playback.tick_interval_ms
        );
        Ok(Self { config, dedup, queue })
    }

    pub fn with_display_sink(self, sink: Arc<dyn TextDisplaySink>) -> Self {
        self.queue.set_display_sink(sink, self.config.display_role.clone());
        self
    }

    /// Dedup an inbound audio message and queue it. Returns `false` when the
    /// message was a duplicate or carried nothing to play or show.
    pub fn handle_message(&self, message: InboundMessage) -> bool {
        if message.audio.is_none() && message.display_text.is_none() {
            debug!("Ignoring audio message without payload or text");
            return false;
        }

        let identity = derive_identity(&message, &self.config.dedup);
        if let Some(identity) = &identity {
            if !self.dedup.lock().should_process(identity) {
                return false;
            }
        }

        let job = AudioJob::from_message(message, self.config.playback.default_slice_ms, identity);
        self.queue.push(job);
        true
    }

    /// Parse and dispatch a JSON session message. Returns whether it led to
    /// a queued job.
    pub fn handle_json(&self, raw: &str) -> Result<bool, LipSyncError> {
        let message: SessionMessage = serde_json::from_str(raw)?;
        match message {
            SessionMessage::Audio(message) if message.audio.is_none() && message.display_text.is_none() => Err(
                LipSyncError::Message("Audio message carries neither audio nor display text".to_string()),
            ),
            SessionMessage::Audio(message) => Ok(self.handle_message(message)),
            SessionMessage::BackendSynthComplete => {
                self.synthesis_complete();
                Ok(false)
            }
            SessionMessage::Control { text } if text == INTERRUPT_COMMAND => {
                self.interrupt();
                Ok(false)
            }
            SessionMessage::Control { text } => {
                debug!("Ignoring control message: {}", text);
                Ok(false)
            }
            SessionMessage::Unknown => {
                debug!("Ignoring unrecognized session message");
                Ok(false)
            }
        }
    }

    /// Backend finished synthesizing a turn; audio identities may recur
    pub fn synthesis_complete(&self) {
        let cleared = self.dedup.lock().clear_audio_identities();
        debug!("Synthesis complete, cleared {} audio identities", cleared);
    }

    /// Stop playback and discard everything queued
    pub fn interrupt(&self) -> usize {
        self.queue.interrupt()
    }

    /// The active model changed
    pub fn swap_model(&self, model: Option<Arc<dyn AnimatableModel>>) {
        self.queue.swap_model(model);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.queue.subscribe()
    }

    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }

    pub fn config(&self) -> &LipSyncConfig {
        &self.config
    }
}
