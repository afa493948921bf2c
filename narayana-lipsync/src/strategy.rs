//! Parameter access strategies, most structured first

use crate::error::ProbeFailure;
use crate::model::AnimatableModel;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Which access path a strategy uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    IndexedTable,
    InternalNamedSetter,
    InternalLegacySetter,
    RawArray,
    PropertyMap,
    MotionManager,
    CoreModel,
    NestedLegacy,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::IndexedTable => "indexed-table",
            StrategyKind::InternalNamedSetter => "internal-named-setter",
            StrategyKind::InternalLegacySetter => "internal-legacy-setter",
            StrategyKind::RawArray => "raw-array",
            StrategyKind::PropertyMap => "property-map",
            StrategyKind::MotionManager => "motion-manager",
            StrategyKind::CoreModel => "core-model",
            StrategyKind::NestedLegacy => "nested-legacy",
        };
        f.write_str(name)
    }
}

/// One way of writing a named parameter on a model
pub trait ParameterStrategy: Send {
    fn kind(&self) -> StrategyKind;

    fn try_set(&mut self, model: &dyn AnimatableModel, name: &str, value: f32) -> Result<(), ProbeFailure>;

    /// Drop anything cached about the previous model
    fn reset(&mut self) {}
}

/// The full candidate list in probing order
pub fn default_strategies() -> Vec<Box<dyn ParameterStrategy>> {
    vec![
        Box::new(IndexedTable),
        Box::new(InternalNamedSetter),
        Box::new(InternalLegacySetter),
        Box::new(RawArray::default()),
        Box::new(PropertyMap),
        Box::new(MotionManager),
        Box::new(CoreModel),
        Box::new(NestedLegacy),
    ]
}

pub struct IndexedTable;

impl ParameterStrategy for IndexedTable {
    fn kind(&self) -> StrategyKind {
        StrategyKind::IndexedTable
    }

    fn try_set(&mut self, model: &dyn AnimatableModel, name: &str, value: f32) -> Result<(), ProbeFailure> {
        let table = model
            .parameter_table()
            .ok_or(ProbeFailure::Unsupported("parameter table"))?;
        let index = table
            .parameter_index(name)
            .ok_or_else(|| ProbeFailure::UnknownParameter(name.to_string()))?;
        table.set_parameter_value_by_index(index, value)
    }
}

pub struct InternalNamedSetter;

impl ParameterStrategy for InternalNamedSetter {
    fn kind(&self) -> StrategyKind {
        StrategyKind::InternalNamedSetter
    }

    fn try_set(&mut self, model: &dyn AnimatableModel, name: &str, value: f32) -> Result<(), ProbeFailure> {
        model
            .internal_model()
            .ok_or(ProbeFailure::Unsupported("internal model"))?
            .set_parameter_value_by_id(name, value)
    }
}

pub struct InternalLegacySetter;

impl ParameterStrategy for InternalLegacySetter {
    fn kind(&self) -> StrategyKind {
        StrategyKind::InternalLegacySetter
    }

    fn try_set(&mut self, model: &dyn AnimatableModel, name: &str, value: f32) -> Result<(), ProbeFailure> {
        model
            .internal_model()
            .ok_or(ProbeFailure::Unsupported("internal model"))?
            .set_param_float(name, value)
    }
}

/// Writes straight into the backing array. The name to index map is built
/// once per model and kept until `reset`.
#[derive(Default)]
pub struct RawArray {
    indices: Option<HashMap<String, usize>>,
}

impl ParameterStrategy for RawArray {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RawArray
    }

    fn try_set(&mut self, model: &dyn AnimatableModel, name: &str, value: f32) -> Result<(), ProbeFailure> {
        let raw = model
            .raw_parameters()
            .ok_or(ProbeFailure::Unsupported("raw parameter array"))?;
        let indices = self.indices.get_or_insert_with(|| {
            raw.parameter_ids()
                .into_iter()
                .enumerate()
                .map(|(index, id)| (id, index))
                .collect()
        });
        let index = *indices
            .get(name)
            .ok_or_else(|| ProbeFailure::UnknownParameter(name.to_string()))?;
        raw.write(index, value)
    }

    fn reset(&mut self) {
        self.indices = None;
    }
}

pub struct PropertyMap;

impl ParameterStrategy for PropertyMap {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PropertyMap
    }

    fn try_set(&mut self, model: &dyn AnimatableModel, name: &str, value: f32) -> Result<(), ProbeFailure> {
        model
            .property_map()
            .ok_or(ProbeFailure::Unsupported("property map"))?
            .set(name, value)
    }
}

pub struct MotionManager;

impl ParameterStrategy for MotionManager {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MotionManager
    }

    fn try_set(&mut self, model: &dyn AnimatableModel, name: &str, value: f32) -> Result<(), ProbeFailure> {
        model
            .motion_manager()
            .ok_or(ProbeFailure::Unsupported("motion manager"))?
            .set(name, value)
    }
}

pub struct CoreModel;

impl ParameterStrategy for CoreModel {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CoreModel
    }

    fn try_set(&mut self, model: &dyn AnimatableModel, name: &str, value: f32) -> Result<(), ProbeFailure> {
        model
            .core_model()
            .ok_or(ProbeFailure::Unsupported("core model"))?
            .set(name, value)
    }
}

pub struct NestedLegacy;

impl ParameterStrategy for NestedLegacy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::NestedLegacy
    }

    fn try_set(&mut self, model: &dyn AnimatableModel, name: &str, value: f32) -> Result<(), ProbeFailure> {
        model
            .legacy_model()
            .ok_or(ProbeFailure::Unsupported("legacy model"))?
            .live_model()
            .ok_or(ProbeFailure::Unsupported("legacy live model"))?
            .set_param_float(name, value)
    }
}
