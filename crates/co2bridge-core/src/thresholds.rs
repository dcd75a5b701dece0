//! CO₂ detection threshold.
//!
//! HomeKit's CO₂ sensor service carries a binary "detected" characteristic
//! alongside the raw level. This module decides that flag from a reading.
//!
//! # Example
//!
//! ```
//! use co2bridge_core::{Co2Detection, Thresholds};
//!
//! let thresholds = Thresholds::default();
//! assert_eq!(thresholds.evaluate_co2(1200.0), Co2Detection::Normal);
//! assert_eq!(thresholds.evaluate_co2(1600.0), Co2Detection::Abnormal);
//! ```

use serde::{Deserialize, Serialize};

use co2bridge_types::{Co2Detection, DEFAULT_CO2_THRESHOLD_PPM, Measurement};

use crate::error::{Error, Result};

/// Configuration for the CO₂ threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Levels strictly above this value (ppm) are reported as detected.
    pub detected_above: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            detected_above: DEFAULT_CO2_THRESHOLD_PPM,
        }
    }
}

/// Threshold evaluator for sensor readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct Thresholds {
    config: ThresholdConfig,
}

impl Thresholds {
    /// Create a new evaluator, rejecting thresholds that are not positive finite numbers.
    pub fn new(config: ThresholdConfig) -> Result<Self> {
        if !config.detected_above.is_finite() || config.detected_above <= 0.0 {
            return Err(Error::invalid_config(format!(
                "CO2 threshold must be a positive number of ppm, got {}",
                config.detected_above
            )));
        }
        Ok(Self { config })
    }

    /// Create an evaluator with a custom threshold in ppm.
    pub fn with_threshold(ppm: f32) -> Result<Self> {
        Self::new(ThresholdConfig {
            detected_above: ppm,
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Classify a CO₂ level.
    pub fn evaluate_co2(&self, co2_ppm: f32) -> Co2Detection {
        Co2Detection::from_level(co2_ppm, self.config.detected_above)
    }

    /// Classify the CO₂ level of a measurement.
    pub fn evaluate(&self, measurement: &Measurement) -> Co2Detection {
        measurement.co2_detection(self.config.detected_above)
    }
}
