//! Shared fixtures: a scripted audio engine and a recording model

#![allow(dead_code)]

use async_trait::async_trait;
use narayana_lipsync::{
    AnimatableModel, AudioEngine, AudioJob, DisplayText, PlaybackError, PlaybackHandle, ParameterSink,
    ProbeFailure, RawParameterArray, TextDisplaySink,
};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Model whose only capability is a property map; records every write
#[derive(Default)]
pub struct RecordingModel {
    writes: Mutex<Vec<f32>>,
    reject: AtomicBool,
}

impl RecordingModel {
    pub fn writes(&self) -> Vec<f32> {
        self.writes.lock().clone()
    }

    pub fn clear(&self) {
        self.writes.lock().clear();
    }

    pub fn last(&self) -> Option<f32> {
        self.writes.lock().last().copied()
    }

    pub fn set_rejecting(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }
}

impl ParameterSink for RecordingModel {
    fn set(&self, id: &str, value: f32) -> Result<(), ProbeFailure> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(ProbeFailure::Rejected(id.to_string()));
        }
        if id != "ParamMouthOpenY" {
            return Err(ProbeFailure::UnknownParameter(id.to_string()));
        }
        self.writes.lock().push(value);
        Ok(())
    }
}

impl AnimatableModel for RecordingModel {
    fn property_map(&self) -> Option<&dyn ParameterSink> {
        Some(self)
    }
}

/// Model exposing only its raw parameter array
pub struct RawModel {
    ids: Vec<String>,
    values: Mutex<Vec<f32>>,
}

impl RawModel {
    pub fn new(ids: &[&str]) -> Self {
        Self {
            ids: ids.iter().map(|s| s.to_string()).collect(),
            values: Mutex::new(vec![0.0; ids.len()]),
        }
    }

    pub fn value(&self, id: &str) -> Option<f32> {
        let index = self.ids.iter().position(|i| i == id)?;
        Some(self.values.lock()[index])
    }
}

impl RawParameterArray for RawModel {
    fn parameter_ids(&self) -> Vec<String> {
        self.ids.clone()
    }

    fn write(&self, index: usize, value: f32) -> Result<(), ProbeFailure> {
        let mut values = self.values.lock();
        let slot = values
            .get_mut(index)
            .ok_or_else(|| ProbeFailure::Rejected(format!("index {}", index)))?;
        *slot = value;
        Ok(())
    }
}

impl AnimatableModel for RawModel {
    fn raw_parameters(&self) -> Option<&dyn RawParameterArray> {
        Some(self)
    }
}

pub struct ScriptedHandle {
    position_bits: AtomicU64,
    done: watch::Sender<Option<Result<(), PlaybackError>>>,
    stopped: AtomicBool,
}

impl ScriptedHandle {
    fn new() -> Self {
        let (done, _) = watch::channel(None);
        Self {
            position_bits: AtomicU64::new(0f64.to_bits()),
            done,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn set_position(&self, position_ms: f64) {
        self.position_bits.store(position_ms.to_bits(), Ordering::SeqCst);
    }

    pub fn complete(&self) {
        self.done.send_replace(Some(Ok(())));
    }

    pub fn fail(&self, reason: &str) {
        self.done.send_replace(Some(Err(PlaybackError::Engine(reason.to_string()))));
    }

    pub fn is_active(&self) -> bool {
        self.done.borrow().is_none()
    }

    pub fn was_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaybackHandle for ScriptedHandle {
    fn position_ms(&self) -> f64 {
        f64::from_bits(self.position_bits.load(Ordering::SeqCst))
    }

    async fn wait_finished(&self) -> Result<(), PlaybackError> {
        let mut rx = self.done.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(result) = current {
                return result;
            }
            if rx.changed().await.is_err() {
                return Ok(());
            }
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.done.send_replace(Some(Ok(())));
    }
}

/// Engine driven entirely by the test
#[derive(Default)]
pub struct ScriptedEngine {
    started: Mutex<Vec<(AudioJob, Arc<ScriptedHandle>)>>,
    fail_start: Mutex<HashSet<usize>>,
    max_active: Mutex<usize>,
}

impl ScriptedEngine {
    /// Make the nth `play` call (0-based) fail to start
    pub fn fail_start_of(&self, call: usize) {
        self.fail_start.lock().insert(call);
    }

    pub fn started(&self) -> usize {
        self.started.lock().len()
    }

    pub fn job(&self, index: usize) -> AudioJob {
        self.started.lock()[index].0.clone()
    }

    pub fn handle(&self, index: usize) -> Arc<ScriptedHandle> {
        self.started.lock()[index].1.clone()
    }

    pub fn active(&self) -> usize {
        self.started.lock().iter().filter(|(_, h)| h.is_active()).count()
    }

    pub fn max_active(&self) -> usize {
        *self.max_active.lock()
    }
}

#[async_trait]
impl AudioEngine for ScriptedEngine {
    async fn play(&self, job: &AudioJob) -> Result<Arc<dyn PlaybackHandle>, PlaybackError> {
        let handle = Arc::new(ScriptedHandle::new());
        let call = {
            let mut started = self.started.lock();
            started.push((job.clone(), handle.clone()));
            started.len() - 1
        };
        if self.fail_start.lock().contains(&call) {
            handle.fail("device unavailable");
            return Err(PlaybackError::Start("device unavailable".to_string()));
        }

        let active = self.active();
        let mut max_active = self.max_active.lock();
        *max_active = (*max_active).max(active);
        Ok(handle)
    }
}

/// Display sink that records what it was asked to show
#[derive(Default)]
pub struct RecordingDisplay {
    shown: Mutex<Vec<(String, String)>>,
}

impl RecordingDisplay {
    pub fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().clone()
    }
}

impl TextDisplaySink for RecordingDisplay {
    fn show(&self, text: &DisplayText, role: &str) {
        self.shown.lock().push((text.text.clone(), role.to_string()));
    }
}

/// Minimal base64 audio payload
pub const AUDIO_B64: &str = "UklGRiQAAABXQVZFZm10IBAAAAABAAEA";

pub fn audio_job(identity: &str) -> AudioJob {
    AudioJob::new(narayana_lipsync::AudioPayload::Encoded(AUDIO_B64.to_string())).with_identity(identity)
}
