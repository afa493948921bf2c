//! Configuration for the lip-sync pipeline

use crate::error::LipSyncError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Parameter names used for mouth openness across authoring pipelines.
pub const DEFAULT_MOUTH_ALIASES: [&str; 4] = [
    "ParamMouthOpenY",
    "PARAM_MOUTH_OPEN_Y",
    "ParamMouthOpen",
    "MouthOpenY",
];

/// Lip-sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LipSyncConfig {
    /// Candidate names for the mouth-openness parameter, tried in order
    pub parameter_aliases: Vec<String>,

    /// Role passed to the text-display sink (default "ai")
    pub display_role: String,

    /// Volume to openness curve
    pub curve: CurveConfig,

    /// Playback scheduling
    pub playback: PlaybackConfig,

    /// Duplicate-delivery filter
    pub dedup: DedupConfig,
}

/// Perceptual curve constants. Tuned by hand; treat as defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CurveConfig {
    /// Volumes at or below this are silence (default 0.05)
    pub silence_threshold: f64,

    /// Compression exponent (default 0.7)
    pub exponent: f64,

    /// Minimum openness once speech is detected (default 0.1)
    pub floor: f64,
}

/// Playback timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Slice length used when a job does not carry one (ms, default 20)
    pub default_slice_ms: f64,

    /// Position sampling cadence (ms, default 10)
    pub tick_interval_ms: u64,

    /// Pause between consecutive jobs (ms, default 50)
    pub settle_delay_ms: u64,

    /// Capacity of the playback event channel
    pub event_buffer: usize,
}

/// Deduplication window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Maximum remembered identities (default 100)
    pub capacity: usize,

    /// Identities kept when the window overflows (default 50)
    pub retain: usize,

    /// Characters of the audio payload used as identity (default 100)
    pub payload_prefix_len: usize,

    /// Characters of display text combined with the timestamp (default 50)
    pub text_excerpt_len: usize,
}

impl Default for LipSyncConfig {
    fn default() -> Self {
        Self {
            parameter_aliases: DEFAULT_MOUTH_ALIASES.iter().map(|s| s.to_string()).collect(),
            display_role: "ai".to_string(),
            curve: CurveConfig::default(),
            playback: PlaybackConfig::default(),
            dedup: DedupConfig::default(),
        }
    }
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.05,
            exponent: 0.7,
            floor: 0.1,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_slice_ms: 20.0,
            tick_interval_ms: 10,
            settle_delay_ms: 50,
            event_buffer: 64,
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            retain: 50,
            payload_prefix_len: 100,
            text_excerpt_len: 50,
        }
    }
}

impl LipSyncConfig {
    /// Load configuration from a JSON or TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LipSyncError> {
        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration, trying JSON first and then TOML
    pub fn from_str(content: &str) -> Result<Self, LipSyncError> {
        if let Ok(config) = serde_json::from_str::<LipSyncConfig>(content) {
            return Ok(config);
        }
        let config = toml::from_str::<LipSyncConfig>(content)?;
        Ok(config)
    }

    /// Defaults overridden by `NARAYANA_LIPSYNC_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Apply `NARAYANA_LIPSYNC_*` overrides in place. Unparseable values are ignored.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_parse::<u64>("NARAYANA_LIPSYNC_TICK_MS") {
            self.playback.tick_interval_ms = v;
        }
        if let Some(v) = env_parse::<u64>("NARAYANA_LIPSYNC_SETTLE_MS") {
            self.playback.settle_delay_ms = v;
        }
        if let Some(v) = env_parse::<f64>("NARAYANA_LIPSYNC_SLICE_MS") {
            self.playback.default_slice_ms = v;
        }
        if let Some(v) = env_parse::<f64>("NARAYANA_LIPSYNC_EXPONENT") {
            self.curve.exponent = v;
        }
        if let Ok(aliases) = std::env::var("NARAYANA_LIPSYNC_ALIASES") {
            let aliases: Vec<String> = aliases
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !aliases.is_empty() {
                self.parameter_aliases = aliases;
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.parameter_aliases.is_empty() {
            return Err("At least one parameter alias is required".to_string());
        }
        for alias in &self.parameter_aliases {
            if alias.is_empty() || alias.len() > 128 {
                return Err(format!("Invalid parameter alias '{}' (1-128 chars)", alias));
            }
            if alias.chars().any(|c| c.is_control() || c.is_whitespace()) {
                return Err(format!("Parameter alias '{}' contains invalid characters", alias));
            }
        }

        if self.display_role.is_empty() {
            return Err("Display role cannot be empty".to_string());
        }

        self.curve.validate()?;
        self.playback.validate()?;
        self.dedup.validate()?;
        Ok(())
    }
}

impl CurveConfig {
    /// Validate curve constants
    pub fn validate(&self) -> Result<(), String> {
        if !self.silence_threshold.is_finite() || !(0.0..1.0).contains(&self.silence_threshold) {
            return Err("Silence threshold must be in [0.0, 1.0)".to_string());
        }
        if !self.exponent.is_finite() || self.exponent <= 0.0 {
            return Err("Curve exponent must be a positive number".to_string());
        }
        if !self.floor.is_finite() || !(0.0..=1.0).contains(&self.floor) {
            return Err("Openness floor must be between 0.0 and 1.0".to_string());
        }
        Ok(())
    }
}

impl PlaybackConfig {
    /// Validate playback timing
    pub fn validate(&self) -> Result<(), String> {
        if !self.default_slice_ms.is_finite() || self.default_slice_ms <= 0.0 {
            return Err("Default slice length must be a positive number".to_string());
        }
        if !(1..=1000).contains(&self.tick_interval_ms) {
            return Err("Tick interval must be between 1 and 1000 ms".to_string());
        }
        const MAX_SETTLE_MS: u64 = 10_000;
        if self.settle_delay_ms > MAX_SETTLE_MS {
            return Err(format!("Settle delay too long (max {} ms)", MAX_SETTLE_MS));
        }
        if self.event_buffer == 0 {
            return Err("Event buffer must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl DedupConfig {
    /// Validate window sizes
    pub fn validate(&self) -> Result<(), String> {
        const MAX_CAPACITY: usize = 100_000;
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(format!("Dedup capacity must be between 1 and {}", MAX_CAPACITY));
        }
        if self.retain == 0 || self.retain > self.capacity {
            return Err("Dedup retain count must be between 1 and capacity".to_string());
        }
        if self.payload_prefix_len == 0 || self.text_excerpt_len == 0 {
            return Err("Identity prefix lengths must be greater than 0".to_string());
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = LipSyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.parameter_aliases[0], "ParamMouthOpenY");
        assert_eq!(config.playback.default_slice_ms, 20.0);
        assert_eq!(config.dedup.capacity, 100);
        assert_eq!(config.dedup.retain, 50);
    }

    #[test]
    fn test_from_str_json_partial() {
        let config = LipSyncConfig::from_str(r#"{"display_role": "assistant", "curve": {"exponent": 0.5}}"#).unwrap();
        assert_eq!(config.display_role, "assistant");
        assert_eq!(config.curve.exponent, 0.5);
        assert_eq!(config.curve.floor, 0.1);
    }

    #[test]
    fn test_from_str_toml() {
        let content = r#"
parameter_aliases = ["MouthOpen"]

[playback]
settle_delay_ms = 80
"#;
        let config = LipSyncConfig::from_str(content).unwrap();
        assert_eq!(config.parameter_aliases, vec!["MouthOpen".to_string()]);
        assert_eq!(config.playback.settle_delay_ms, 80);
        assert_eq!(config.playback.tick_interval_ms, 10);
    }

    #[test]
    fn test_from_str_garbage() {
        assert!(LipSyncConfig::from_str("{{ not a config").is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = LipSyncConfig::default();
        config.parameter_aliases.clear();
        assert!(config.validate().is_err());

        let mut config = LipSyncConfig::default();
        config.parameter_aliases.push("Mouth Open".to_string());
        assert!(config.validate().is_err());

        let mut config = LipSyncConfig::default();
        config.curve.exponent = 0.0;
        assert!(config.validate().is_err());

        let mut config = LipSyncConfig::default();
        config.curve.silence_threshold = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = LipSyncConfig::default();
        config.playback.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = LipSyncConfig::default();
        config.dedup.retain = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dedup_capacity_bounded() {
        let mut config = LipSyncConfig::default();
        config.dedup.capacity = 100_000;
        assert!(config.validate().is_ok());

        config.dedup.capacity = 100_001;
        assert!(config.validate().is_err());

        config.dedup.capacity = usize::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_env_overrides() {
        // Only test in this crate that touches NARAYANA_LIPSYNC_* variables
        std::env::set_var("NARAYANA_LIPSYNC_TICK_MS", " 25 ");
        std::env::set_var("NARAYANA_LIPSYNC_SETTLE_MS", "soon");
        std::env::set_var("NARAYANA_LIPSYNC_SLICE_MS", "40");
        std::env::set_var("NARAYANA_LIPSYNC_EXPONENT", "not-a-number");
        std::env::set_var("NARAYANA_LIPSYNC_ALIASES", " MouthA, ,MouthB ,");

        let config = LipSyncConfig::from_env();

        std::env::set_var("NARAYANA_LIPSYNC_ALIASES", " , ");
        let mut blank_aliases = LipSyncConfig::default();
        blank_aliases.apply_env();

        for key in [
            "NARAYANA_LIPSYNC_TICK_MS",
            "NARAYANA_LIPSYNC_SETTLE_MS",
            "NARAYANA_LIPSYNC_SLICE_MS",
            "NARAYANA_LIPSYNC_EXPONENT",
            "NARAYANA_LIPSYNC_ALIASES",
        ] {
            std::env::remove_var(key);
        }

        assert_eq!(config.playback.tick_interval_ms, 25);
        assert_eq!(config.playback.default_slice_ms, 40.0);
        // Unparseable values leave the defaults alone
        assert_eq!(config.playback.settle_delay_ms, 50);
        assert_eq!(config.curve.exponent, 0.7);
        assert_eq!(config.parameter_aliases, vec!["MouthA".to_string(), "MouthB".to_string()]);
        assert!(config.validate().is_ok());

        assert_eq!(blank_aliases.parameter_aliases[0], "ParamMouthOpenY");
        assert_eq!(blank_aliases.parameter_aliases.len(), 4);
    }
}
