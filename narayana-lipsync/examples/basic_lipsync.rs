//! Basic lip-sync example
//!
//! Plays two utterances through a simulated audio engine and prints every
//! mouth-openness write the model receives. Run with `RUST_LOG=debug` to see
//! the queue and probing logs.

use async_trait::async_trait;
use narayana_lipsync::{
    AnimatableModel, AudioEngine, AudioJob, DisplayText, LipSyncConfig, LipSyncSession, ParameterSink,
    PlaybackError, PlaybackEvent, PlaybackHandle, ProbeFailure, TextDisplaySink,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

/// Engine that "plays" audio by letting the clock run for a fixed duration
struct ClockEngine {
    duration: Duration,
}

struct ClockHandle {
    started: Instant,
    duration: Duration,
}

#[async_trait]
impl AudioEngine for ClockEngine {
    async fn play(&self, job: &AudioJob) -> Result<Arc<dyn PlaybackHandle>, PlaybackError> {
        let payload = job
            .payload
            .as_ref()
            .ok_or_else(|| PlaybackError::Start("Job has no audio".to_string()))?;
        let bytes = payload.load().await?;
        println!("Playing {} bytes of audio", bytes.len());
        Ok(Arc::new(ClockHandle {
            started: Instant::now(),
            duration: self.duration,
        }))
    }
}

#[async_trait]
impl PlaybackHandle for ClockHandle {
    fn position_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    async fn wait_finished(&self) -> Result<(), PlaybackError> {
        tokio::time::sleep_until(self.started + self.duration).await;
        Ok(())
    }

    fn stop(&self) {}
}

/// Model that exposes a property map and prints writes
struct PrintingModel;

impl ParameterSink for PrintingModel {
    fn set(&self, id: &str, value: f32) -> Result<(), ProbeFailure> {
        if id != "ParamMouthOpenY" {
            return Err(ProbeFailure::UnknownParameter(id.to_string()));
        }
        println!("  {} = {:.3}", id, value);
        Ok(())
    }
}

impl AnimatableModel for PrintingModel {
    fn property_map(&self) -> Option<&dyn ParameterSink> {
        Some(self)
    }
}

struct ConsoleDisplay;

impl TextDisplaySink for ConsoleDisplay {
    fn show(&self, text: &DisplayText, role: &str) {
        println!("[{}] {}", role, text.text);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = LipSyncConfig::from_env();
    config.playback.tick_interval_ms = 40;

    let engine = Arc::new(ClockEngine {
        duration: Duration::from_millis(200),
    });
    let session = LipSyncSession::new(config, engine)?.with_display_sink(Arc::new(ConsoleDisplay));
    session.swap_model(Some(Arc::new(PrintingModel)));
    let mut events = session.subscribe();

    for (i, text) in ["Hello there!", "Nice to meet you."].iter().enumerate() {
        let message = json!({
            "type": "audio",
            "audio": "UklGRiQAAABXQVZFZm10IBAAAAABAAEA",
            "volumes": [0.0, 0.3, 0.9, 0.6, 0.2, 0.04, 0.5, 0.8, 0.1, 0.0],
            "slice_length": 20,
            "display_text": { "text": text, "name": "Mao" },
            "timestamp": i as f64,
        });
        session.handle_json(&message.to_string())?;
    }

    loop {
        match events.recv().await? {
            PlaybackEvent::Idle => break,
            event => println!("Event: {}", serde_json::to_string(&event)?),
        }
    }

    println!("Done");
    Ok(())
}
