//! Volume to mouth-openness driver

use crate::config::CurveConfig;
use crate::model::AnimatableModel;
use crate::parameter::ParameterAdapter;

/// Perceptual curve mapping a linear volume sample to mouth openness
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LipSyncCurve {
    silence_threshold: f64,
    exponent: f64,
    floor: f64,
}

impl Default for LipSyncCurve {
    fn default() -> Self {
        Self::from(CurveConfig::default())
    }
}

impl From<CurveConfig> for LipSyncCurve {
    fn from(config: CurveConfig) -> Self {
        Self {
            silence_threshold: config.silence_threshold,
            exponent: config.exponent,
            floor: config.floor,
        }
    }
}

impl LipSyncCurve {
    /// `0` at or below the silence threshold, otherwise `max(volume^exponent, floor)`.
    /// Non-finite samples count as silence.
    pub fn openness(&self, volume: f64) -> f64 {
        if !volume.is_finite() || volume <= self.silence_threshold {
            return 0.0;
        }
        volume.powf(self.exponent).max(self.floor)
    }
}

/// Drives the mouth parameter from volume samples
pub struct AnimationDriver {
    adapter: ParameterAdapter,
    curve: LipSyncCurve,
    last_applied: Option<f64>,
}

impl AnimationDriver {
    pub fn new(adapter: ParameterAdapter, curve: LipSyncCurve) -> Self {
        Self {
            adapter,
            curve,
            last_applied: None,
        }
    }

    /// Map `raw_volume` through the curve and write it to the model
    pub fn apply(&mut self, model: Option<&dyn AnimatableModel>, raw_volume: f64) -> bool {
        let openness = self.curve.openness(raw_volume);
        self.write(model, openness)
    }

    /// Close the mouth
    pub fn reset(&mut self, model: Option<&dyn AnimatableModel>) -> bool {
        self.write(model, 0.0)
    }

    fn write(&mut self, model: Option<&dyn AnimatableModel>, openness: f64) -> bool {
        let applied = self.adapter.set_value(model, openness);
        if applied {
            self.last_applied = Some(openness);
        }
        applied
    }

    /// Last openness that reached the model
    pub fn last_applied(&self) -> Option<f64> {
        self.last_applied
    }

    pub fn curve(&self) -> &LipSyncCurve {
        &self.curve
    }

    pub fn adapter(&self) -> &ParameterAdapter {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut ParameterAdapter {
        &mut self.adapter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeFailure;
    use crate::model::ParameterSink;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        writes: Mutex<Vec<(String, f32)>>,
    }

    impl ParameterSink for Recorder {
        fn set(&self, id: &str, value: f32) -> Result<(), ProbeFailure> {
            self.writes.lock().push((id.to_string(), value));
            Ok(())
        }
    }

    impl AnimatableModel for Recorder {
        fn property_map(&self) -> Option<&dyn ParameterSink> {
            Some(self)
        }
    }

    fn driver() -> AnimationDriver {
        AnimationDriver::new(ParameterAdapter::default(), LipSyncCurve::default())
    }

    #[test]
    fn test_curve_silence() {
        let curve = LipSyncCurve::default();
        assert_eq!(curve.openness(0.0), 0.0);
        assert_eq!(curve.openness(0.03), 0.0);
        assert_eq!(curve.openness(0.05), 0.0);
        assert_eq!(curve.openness(f64::NAN), 0.0);
        assert_eq!(curve.openness(-1.0), 0.0);
    }

    #[test]
    fn test_curve_values() {
        let curve = LipSyncCurve::default();
        assert!((curve.openness(1.0) - 1.0).abs() < 1e-9);
        assert!((curve.openness(0.06) - 0.14).abs() < 0.01);
        assert!((curve.openness(0.5) - 0.5f64.powf(0.7)).abs() < 1e-9);
    }

    #[test]
    fn test_curve_floor() {
        let curve = LipSyncCurve::from(CurveConfig {
            silence_threshold: 0.01,
            exponent: 2.0,
            floor: 0.1,
        });
        // 0.02^2 = 0.0004, lifted to the floor
        assert_eq!(curve.openness(0.02), 0.1);
    }

    #[test]
    fn test_apply_writes_openness() {
        let model = Recorder::default();
        let mut driver = driver();

        assert!(driver.apply(Some(&model), 0.03));
        assert!(driver.apply(Some(&model), 1.0));
        assert!(driver.apply(Some(&model), 0.06));

        let writes = model.writes.lock();
        assert_eq!(writes.len(), 3);
        assert_eq!(writes[0], ("ParamMouthOpenY".to_string(), 0.0));
        assert!((writes[1].1 - 1.0).abs() < 1e-6);
        assert!((writes[2].1 - 0.14).abs() < 0.01);
        assert!((driver.last_applied().unwrap() - 0.14).abs() < 0.01);
    }

    #[test]
    fn test_reset_closes_mouth() {
        let model = Recorder::default();
        let mut driver = driver();
        driver.apply(Some(&model), 0.8);
        assert!(driver.reset(Some(&model)));
        assert_eq!(driver.last_applied(), Some(0.0));
        assert_eq!(model.writes.lock().last().unwrap().1, 0.0);
    }

    #[test]
    fn test_apply_without_model() {
        let mut driver = driver();
        assert!(!driver.apply(None, 0.8));
        assert!(driver.last_applied().is_none());
    }
}
