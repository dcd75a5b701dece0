//! Core types for SCD30 sensor data and the accessory it is published as.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};
use crate::format::format_significant;

/// CO₂ concentration above which the accessory reports abnormal levels, in ppm.
pub const DEFAULT_CO2_THRESHOLD_PPM: f32 = 1500.0;

/// A single reading from the sensor.
///
/// Readings are produced fresh on every poll and are not retained.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Measurement {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
    /// CO₂ concentration in ppm.
    pub co2: f32,
}

impl Measurement {
    /// Create a measurement from raw values.
    #[must_use]
    pub fn new(temperature: f32, humidity: f32, co2: f32) -> Self {
        Self {
            temperature,
            humidity,
            co2,
        }
    }

    /// Check that every field holds a publishable value.
    ///
    /// The SCD30 reports IEEE floats straight off the wire, so a corrupted
    /// transfer can surface as NaN or infinity.
    pub fn validate(&self) -> ParseResult<()> {
        for (field, value) in [
            ("temperature", self.temperature),
            ("humidity", self.humidity),
            ("co2", self.co2),
        ] {
            if !value.is_finite() {
                return Err(ParseError::InvalidMeasurement { field, value });
            }
        }
        Ok(())
    }

    /// Detection state of this reading for the given threshold.
    #[must_use]
    pub fn co2_detection(&self, threshold_ppm: f32) -> Co2Detection {
        Co2Detection::from_level(self.co2, threshold_ppm)
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Temp: {}°C, Hum: {}%, CO₂: {} ppm",
            format_significant(f64::from(self.temperature), 4),
            format_significant(f64::from(self.humidity), 3),
            format_significant(f64::from(self.co2), 4),
        )
    }
}

/// Value of the HomeKit "Carbon Dioxide Detected" characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Co2Detection {
    /// CO₂ levels normal.
    #[default]
    Normal = 0,
    /// CO₂ levels abnormal.
    Abnormal = 1,
}

impl Co2Detection {
    /// Classify a CO₂ level. Only values strictly above the threshold are abnormal.
    ///
    /// # Examples
    ///
    /// ```
    /// use co2bridge_types::Co2Detection;
    ///
    /// assert_eq!(Co2Detection::from_level(1500.0, 1500.0), Co2Detection::Normal);
    /// assert_eq!(Co2Detection::from_level(1500.5, 1500.0), Co2Detection::Abnormal);
    /// ```
    #[must_use]
    pub fn from_level(co2_ppm: f32, threshold_ppm: f32) -> Self {
        if co2_ppm > threshold_ppm {
            Co2Detection::Abnormal
        } else {
            Co2Detection::Normal
        }
    }

    /// The raw characteristic value.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Co2Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Co2Detection::Normal => write!(f, "Normal"),
            Co2Detection::Abnormal => write!(f, "Abnormal"),
        }
    }
}

/// Identity advertised by the bridge accessory.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AccessoryInfo {
    /// Accessory name shown in the Home app.
    pub name: String,
    /// Manufacturer name.
    pub manufacturer: String,
    /// Model name.
    pub model: String,
    /// Serial number.
    pub serial_number: String,
    /// Firmware revision.
    pub firmware_revision: String,
}

impl Default for AccessoryInfo {
    fn default() -> Self {
        Self {
            name: "SCD30 Sensor".to_string(),
            manufacturer: "Sensirion".to_string(),
            model: "SCD30".to_string(),
            serial_number: "1-101625-10".to_string(),
            firmware_revision: "1.0".to_string(),
        }
    }
}

impl AccessoryInfo {
    /// Default identity with a custom display name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
