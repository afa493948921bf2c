//! Serialized audio playback with position-driven lip-sync
//!
//! One job plays at a time. While a job with a volume track is playing, a
//! [`TickHandle`] samples the engine's playback position and feeds the
//! matching volume slice through the [`AnimationDriver`]. When a job ends,
//! fails or is cancelled, the tick is cancelled and the mouth is closed
//! before the next job starts.

use crate::config::PlaybackConfig;
use crate::driver::AnimationDriver;
use crate::error::PlaybackError;
use crate::message::{Actions, AudioJob, DisplayText};
use crate::model::{AnimatableModel, ModelSlot};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Audio output device or decoder
#[async_trait]
pub trait AudioEngine: Send + Sync {
    /// Begin playing `job`. Returns once playback has started.
    async fn play(&self, job: &AudioJob) -> Result<Arc<dyn PlaybackHandle>, PlaybackError>;
}

/// A single in-progress playback
#[async_trait]
pub trait PlaybackHandle: Send + Sync {
    /// Current playback position in milliseconds
    fn position_ms(&self) -> f64;

    /// Resolves when playback ends or fails
    async fn wait_finished(&self) -> Result<(), PlaybackError>;

    fn stop(&self);
}

/// Receives display text when a job starts. Must not block.
pub trait TextDisplaySink: Send + Sync {
    fn show(&self, text: &DisplayText, role: &str);
}

/// Notifications about queue progress
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PlaybackEvent {
    /// A locally originated job began playing
    #[serde(rename = "audio-play-start")]
    Started {
        identity: Option<String>,
        display_text: Option<DisplayText>,
        actions: Option<Actions>,
        forwarded: bool,
    },
    Finished { identity: Option<String> },
    Failed { identity: Option<String>, reason: String },
    Cancelled { identity: Option<String> },
    /// Queue drained
    Idle,
}

/// Point-in-time view of the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackSnapshot {
    pub queued: usize,
    pub current: Option<String>,
    pub is_playing: bool,
}

/// Periodic sampling task. Cancellation is synchronous and idempotent, and
/// dropping the handle cancels it.
pub struct TickHandle {
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl TickHandle {
    /// Run `on_tick` every `period`, starting immediately. The callback gets
    /// the cancellation flag so it can re-check it after taking locks.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut(&AtomicBool) + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if flag.load(Ordering::Acquire) {
                    break;
                }
                on_tick(&flag);
            }
        });
        Self {
            cancelled,
            task: Some(task),
        }
    }

    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Default)]
struct PlaybackState {
    queue: VecDeque<AudioJob>,
    current: Option<AudioJob>,
    is_playing: bool,
    tick: Option<TickHandle>,
    cancel: Option<CancellationToken>,
}

enum Outcome {
    Finished,
    Failed(PlaybackError),
    Cancelled,
}

struct QueueInner {
    state: Mutex<PlaybackState>,
    driver: Arc<Mutex<AnimationDriver>>,
    model: ModelSlot,
    engine: Arc<dyn AudioEngine>,
    display: RwLock<Option<(Arc<dyn TextDisplaySink>, String)>>,
    events: broadcast::Sender<PlaybackEvent>,
    config: PlaybackConfig,
    runtime: Handle,
}

/// FIFO of audio jobs with at most one playing
#[derive(Clone)]
pub struct PlaybackQueue {
    inner: Arc<QueueInner>,
}

impl PlaybackQueue {
    /// Jobs run on `runtime`, so `push` may be called from any thread.
    pub fn new(
        engine: Arc<dyn AudioEngine>,
        driver: AnimationDriver,
        model: ModelSlot,
        config: PlaybackConfig,
        runtime: Handle,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(PlaybackState::default()),
                driver: Arc::new(Mutex::new(driver)),
                model,
                engine,
                display: RwLock::new(None),
                events,
                config,
                runtime,
            }),
        }
    }

    /// Route display text to `sink`, tagged with `role`
    pub fn set_display_sink(&self, sink: Arc<dyn TextDisplaySink>, role: impl Into<String>) {
        *self.inner.display.write() = Some((sink, role.into()));
    }

    /// Append a job. If the queue is idle the job becomes current before
    /// this returns and playback starts on a spawned task.
    pub fn push(&self, job: AudioJob) {
        let start = {
            let mut state = self.inner.state.lock();
            if state.is_playing {
                debug!("Queued audio job {:?} ({} waiting)", job.identity, state.queue.len() + 1);
                state.queue.push_back(job);
                None
            } else {
                let token = CancellationToken::new();
                state.is_playing = true;
                state.current = Some(job.clone());
                state.cancel = Some(token.clone());
                Some((job, token))
            }
        };

        if let Some((job, token)) = start {
            let inner = self.inner.clone();
            self.inner.runtime.spawn(async move {
                inner.run(job, token).await;
            });
        }
    }

    /// Cancel the in-flight job and let the queue advance
    pub fn stop_current(&self) -> bool {
        let mut state = self.inner.state.lock();
        if let Some(mut tick) = state.tick.take() {
            tick.cancel();
        }
        match &state.cancel {
            Some(token) if !token.is_cancelled() => {
                token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Drop every queued job and cancel the current one. Returns the number
    /// of jobs discarded, the current one included.
    pub fn interrupt(&self) -> usize {
        let dropped = {
            let mut state = self.inner.state.lock();
            let dropped = state.queue.len();
            state.queue.clear();
            dropped
        };
        let stopped = self.stop_current();
        info!("Playback interrupted ({} queued jobs dropped)", dropped);
        dropped + usize::from(stopped)
    }

    /// Install a new model. The old model's mouth is closed, the adapter
    /// forgets its resolved strategy, and any in-flight job is cancelled.
    pub fn swap_model(&self, model: Option<Arc<dyn AnimatableModel>>) {
        let mut state = self.inner.state.lock();
        if let Some(mut tick) = state.tick.take() {
            tick.cancel();
        }
        {
            let mut driver = self.inner.driver.lock();
            let old = self.inner.model.current();
            driver.reset(old.as_deref());
            driver.adapter_mut().reset();
            self.inner.model.replace(model);
        }
        if let Some(token) = &state.cancel {
            token.cancel();
        }
        info!("Active model swapped, parameter strategy reset");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.inner.events.subscribe()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let state = self.inner.state.lock();
        PlaybackSnapshot {
            queued: state.queue.len(),
            current: state.current.as_ref().and_then(|job| job.identity.clone()),
            is_playing: state.is_playing,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.inner.state.lock().is_playing
    }

    pub fn current(&self) -> Option<AudioJob> {
        self.inner.state.lock().current.clone()
    }

    pub fn queued(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// The active model. Install a different one with [`swap_model`](Self::swap_model).
    pub fn current_model(&self) -> Option<Arc<dyn AnimatableModel>> {
        self.inner.model.current()
    }

    pub fn driver(&self) -> Arc<Mutex<AnimationDriver>> {
        self.inner.driver.clone()
    }
}

impl QueueInner {
    async fn run(self: Arc<Self>, mut job: AudioJob, mut token: CancellationToken) {
        loop {
            let outcome = self.play_one(&job, &token).await;
            self.finish(&job, outcome);

            if self.config.settle_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
            }

            match self.advance() {
                Some((next, next_token)) => {
                    job = next;
                    token = next_token;
                }
                None => break,
            }
        }
    }

    async fn play_one(&self, job: &AudioJob, token: &CancellationToken) -> Outcome {
        debug!("Starting audio job {:?}", job.identity);
        self.show_text(job);
        if !job.forwarded {
            self.emit(PlaybackEvent::Started {
                identity: job.identity.clone(),
                display_text: job.display_text.clone(),
                actions: job.actions.clone(),
                forwarded: job.forwarded,
            });
        }

        if job.payload.is_none() {
            return Outcome::Finished;
        }

        let started = tokio::select! {
            _ = token.cancelled() => return Outcome::Cancelled,
            started = self.engine.play(job) => started,
        };
        let handle = match started {
            Ok(handle) => handle,
            Err(e) => return Outcome::Failed(e),
        };

        if job.volume_track.is_some() {
            self.start_tick(job, handle.clone(), token);
        }

        tokio::select! {
            result = handle.wait_finished() => match result {
                Ok(()) => Outcome::Finished,
                Err(e) => Outcome::Failed(e),
            },
            _ = token.cancelled() => {
                handle.stop();
                Outcome::Cancelled
            }
        }
    }

    fn start_tick(&self, job: &AudioJob, handle: Arc<dyn PlaybackHandle>, token: &CancellationToken) {
        let mut state = self.state.lock();
        if token.is_cancelled() {
            return;
        }
        if let Some(mut previous) = state.tick.take() {
            previous.cancel();
        }

        let driver = self.driver.clone();
        let model = self.model.clone();
        let job = job.clone();
        let period = Duration::from_millis(self.config.tick_interval_ms.max(1));
        state.tick = Some(TickHandle::spawn(period, move |cancelled| {
            let Some(volume) = job.volume_at(handle.position_ms()) else {
                return;
            };
            let mut driver = driver.lock();
            // A reset may have landed while we waited for the lock
            if cancelled.load(Ordering::Acquire) {
                return;
            }
            let model = model.current();
            driver.apply(model.as_deref(), volume);
        }));
    }

    fn finish(&self, job: &AudioJob, outcome: Outcome) {
        let tick = self.state.lock().tick.take();
        if let Some(mut tick) = tick {
            tick.cancel();
        }
        {
            let model = self.model.current();
            self.driver.lock().reset(model.as_deref());
        }
        {
            let mut state = self.state.lock();
            state.current = None;
            state.cancel = None;
        }

        let identity = job.identity.clone();
        match outcome {
            Outcome::Finished => {
                debug!("Audio job {:?} finished", identity);
                self.emit(PlaybackEvent::Finished { identity });
            }
            Outcome::Failed(e) => {
                warn!("Audio job {:?} failed: {}", identity, e);
                self.emit(PlaybackEvent::Failed {
                    identity,
                    reason: e.to_string(),
                });
            }
            Outcome::Cancelled => {
                debug!("Audio job {:?} cancelled", identity);
                self.emit(PlaybackEvent::Cancelled { identity });
            }
        }
    }

    fn advance(&self) -> Option<(AudioJob, CancellationToken)> {
        let mut state = self.state.lock();
        match state.queue.pop_front() {
            Some(next) => {
                let token = CancellationToken::new();
                state.current = Some(next.clone());
                state.cancel = Some(token.clone());
                Some((next, token))
            }
            None => {
                state.is_playing = false;
                drop(state);
                debug!("Playback queue idle");
                self.emit(PlaybackEvent::Idle);
                None
            }
        }
    }

    fn show_text(&self, job: &AudioJob) {
        let Some(text) = &job.display_text else {
            return;
        };
        if let Some((sink, role)) = self.display.read().as_ref() {
            sink.show(text, role);
        }
    }

    fn emit(&self, event: PlaybackEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
