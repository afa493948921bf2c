//! Capability surface of an externally supplied animatable model
//!
//! The lip-sync core never knows which engine or authoring pipeline produced
//! the model it animates. Each access path a model might offer is exposed as
//! an optional capability; a model implements the accessors it actually has
//! and leaves the rest at their `None` defaults. The parameter adapter probes
//! these at runtime.

use crate::error::ProbeFailure;
use parking_lot::RwLock;
use std::sync::Arc;

/// Indexed parameter table: resolve a parameter name to a numeric id, then
/// write by id.
pub trait ParameterTable: Send + Sync {
    fn parameter_index(&self, id: &str) -> Option<usize>;
    fn set_parameter_value_by_index(&self, index: usize, value: f32) -> Result<(), ProbeFailure>;
}

/// Internal sub-object with named setters. Pipelines differ in which variant
/// they provide, so both default to unsupported.
pub trait InternalModel: Send + Sync {
    fn set_parameter_value_by_id(&self, _id: &str, _value: f32) -> Result<(), ProbeFailure> {
        Err(ProbeFailure::Unsupported("set_parameter_value_by_id"))
    }

    /// Legacy setter
    fn set_param_float(&self, _id: &str, _value: f32) -> Result<(), ProbeFailure> {
        Err(ProbeFailure::Unsupported("set_param_float"))
    }
}

/// Raw backing array of parameter values plus the matching id list
pub trait RawParameterArray: Send + Sync {
    fn parameter_ids(&self) -> Vec<String>;
    fn write(&self, index: usize, value: f32) -> Result<(), ProbeFailure>;
}

/// Any surface that accepts a named value (property maps, motion managers,
/// alternate core models)
pub trait ParameterSink: Send + Sync {
    fn set(&self, id: &str, value: f32) -> Result<(), ProbeFailure>;
}

/// Legacy wrapper whose live model sits one level further down
pub trait LegacyModel: Send + Sync {
    fn live_model(&self) -> Option<&dyn InternalModel>;
}

/// Opaque handle to a renderable character
pub trait AnimatableModel: Send + Sync {
    fn parameter_table(&self) -> Option<&dyn ParameterTable> {
        None
    }

    fn internal_model(&self) -> Option<&dyn InternalModel> {
        None
    }

    fn raw_parameters(&self) -> Option<&dyn RawParameterArray> {
        None
    }

    fn property_map(&self) -> Option<&dyn ParameterSink> {
        None
    }

    fn motion_manager(&self) -> Option<&dyn ParameterSink> {
        None
    }

    fn core_model(&self) -> Option<&dyn ParameterSink> {
        None
    }

    fn legacy_model(&self) -> Option<&dyn LegacyModel> {
        None
    }
}

/// Shared holder of the currently active model
#[derive(Clone, Default)]
pub struct ModelSlot {
    inner: Arc<RwLock<Option<Arc<dyn AnimatableModel>>>>,
}

impl ModelSlot {
    pub fn new(model: Option<Arc<dyn AnimatableModel>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(model)),
        }
    }

    /// Currently active model, if any
    pub fn current(&self) -> Option<Arc<dyn AnimatableModel>> {
        self.inner.read().clone()
    }

    /// Install a new model, returning the previous one. Crate-internal so
    /// every swap goes through `PlaybackQueue::swap_model`, which resets the
    /// adapter.
    pub(crate) fn replace(&self, model: Option<Arc<dyn AnimatableModel>>) -> Option<Arc<dyn AnimatableModel>> {
        std::mem::replace(&mut *self.inner.write(), model)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_none()
    }
}

impl std::fmt::Debug for ModelSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSlot")
            .field("occupied", &!self.is_empty())
            .finish()
    }
}
