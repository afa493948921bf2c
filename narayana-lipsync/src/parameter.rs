//! Parameter adapter: finds a working way to write mouth openness on a model
//! whose API shape is not known in advance.

use crate::config::DEFAULT_MOUTH_ALIASES;
use crate::model::AnimatableModel;
use crate::strategy::{default_strategies, ParameterStrategy, StrategyKind};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

/// A value handed to the adapter before numeric coercion
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterInput {
    Number(f64),
    Text(String),
    Bool(bool),
    Null,
}

impl ParameterInput {
    /// Numeric value, or `None` if the input cannot be read as a number.
    /// Infinities are kept so they clamp to the range ends.
    pub fn coerce(&self) -> Option<f64> {
        match self {
            ParameterInput::Number(n) if n.is_nan() => None,
            ParameterInput::Number(n) => Some(*n),
            ParameterInput::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return None;
                }
                trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
            }
            ParameterInput::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParameterInput::Null => None,
        }
    }
}

impl From<f64> for ParameterInput {
    fn from(value: f64) -> Self {
        ParameterInput::Number(value)
    }
}

impl From<f32> for ParameterInput {
    fn from(value: f32) -> Self {
        ParameterInput::Number(value as f64)
    }
}

impl From<i32> for ParameterInput {
    fn from(value: i32) -> Self {
        ParameterInput::Number(value as f64)
    }
}

impl From<bool> for ParameterInput {
    fn from(value: bool) -> Self {
        ParameterInput::Bool(value)
    }
}

impl From<&str> for ParameterInput {
    fn from(value: &str) -> Self {
        ParameterInput::Text(value.to_string())
    }
}

impl From<String> for ParameterInput {
    fn from(value: String) -> Self {
        ParameterInput::Text(value)
    }
}

impl From<Option<f64>> for ParameterInput {
    fn from(value: Option<f64>) -> Self {
        value.map(ParameterInput::Number).unwrap_or(ParameterInput::Null)
    }
}

impl From<&serde_json::Value> for ParameterInput {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => n.as_f64().map(ParameterInput::Number).unwrap_or(ParameterInput::Null),
            serde_json::Value::String(s) => ParameterInput::Text(s.clone()),
            serde_json::Value::Bool(b) => ParameterInput::Bool(*b),
            _ => ParameterInput::Null,
        }
    }
}

/// The candidate that last succeeded for the current model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedStrategy {
    pub kind: StrategyKind,
    pub alias: String,
    #[serde(skip)]
    strategy_index: usize,
    #[serde(skip)]
    alias_index: usize,
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProbeStats {
    /// Calls that reached dispatch
    pub calls: u64,
    /// Full re-probes (no cache, or cache failed)
    pub probes: u64,
    /// Individual candidate attempts
    pub attempts: u64,
    /// Calls where every candidate failed
    pub exhaustions: u64,
}

/// Writes the mouth-openness parameter through whichever access path works
pub struct ParameterAdapter {
    strategies: Vec<Box<dyn ParameterStrategy>>,
    aliases: Vec<String>,
    resolved: Option<ResolvedStrategy>,
    exhaustion_reported: bool,
    stats: ProbeStats,
}

impl Default for ParameterAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_MOUTH_ALIASES.iter().map(|s| s.to_string()).collect())
    }
}

impl ParameterAdapter {
    /// Adapter over the standard candidate list
    pub fn new(aliases: Vec<String>) -> Self {
        Self::with_strategies(default_strategies(), aliases)
    }

    /// Adapter over a custom candidate list, tried in the given order
    pub fn with_strategies(strategies: Vec<Box<dyn ParameterStrategy>>, aliases: Vec<String>) -> Self {
        Self {
            strategies,
            aliases,
            resolved: None,
            exhaustion_reported: false,
            stats: ProbeStats::default(),
        }
    }

    /// Set mouth openness on `model`. Returns `true` if some candidate accepted
    /// the write. The value is clamped to `[0, 1]` before dispatch.
    pub fn set_value(&mut self, model: Option<&dyn AnimatableModel>, value: impl Into<ParameterInput>) -> bool {
        let Some(model) = model else {
            return false;
        };

        let input = value.into();
        let Some(number) = input.coerce() else {
            warn!("Ignoring non-numeric parameter value: {:?}", input);
            return false;
        };
        let value = number.clamp(0.0, 1.0) as f32;
        self.stats.calls += 1;

        if let Some(resolved) = self.resolved.take() {
            let alias = &self.aliases[resolved.alias_index];
            match self.strategies[resolved.strategy_index].try_set(model, alias, value) {
                Ok(()) => {
                    self.resolved = Some(resolved);
                    return true;
                }
                Err(e) => {
                    debug!("Cached strategy {} ({}) failed: {}, re-probing", resolved.kind, resolved.alias, e);
                }
            }
        }

        self.stats.probes += 1;
        for (strategy_index, strategy) in self.strategies.iter_mut().enumerate() {
            for (alias_index, alias) in self.aliases.iter().enumerate() {
                self.stats.attempts += 1;
                match strategy.try_set(model, alias, value) {
                    Ok(()) => {
                        info!("Resolved mouth parameter via {} ({})", strategy.kind(), alias);
                        self.resolved = Some(ResolvedStrategy {
                            kind: strategy.kind(),
                            alias: alias.clone(),
                            strategy_index,
                            alias_index,
                        });
                        self.exhaustion_reported = false;
                        return true;
                    }
                    Err(e) => trace!("{} ({}) failed: {}", strategy.kind(), alias, e),
                }
            }
        }

        self.stats.exhaustions += 1;
        if self.exhaustion_reported {
            debug!("No parameter candidate accepted the mouth value");
        } else {
            warn!(
                "No parameter candidate accepted the mouth value ({} strategies x {} aliases)",
                self.strategies.len(),
                self.aliases.len()
            );
            self.exhaustion_reported = true;
        }
        false
    }

    /// Forget the resolved strategy and any per-model caches. Call whenever
    /// the active model instance changes.
    pub fn reset(&mut self) {
        self.resolved = None;
        self.exhaustion_reported = false;
        for strategy in &mut self.strategies {
            strategy.reset();
        }
    }

    pub fn resolved(&self) -> Option<&ResolvedStrategy> {
        self.resolved.as_ref()
    }

    pub fn stats(&self) -> ProbeStats {
        self.stats
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }
}
