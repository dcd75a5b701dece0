//! Platform-agnostic types for the co2bridge SCD30 HomeKit bridge.
//!
//! This crate provides shared types used by the sensor layer
//! (co2bridge-core) and the accessory service (co2bridge-service).
//!
//! # Features
//!
//! - Sensor [`Measurement`] with validation and console formatting
//! - [`Co2Detection`] classification for the CO₂ "detected" characteristic
//! - [`AccessoryInfo`] identity for the bridge
//!
//! # Example
//!
//! ```
//! use co2bridge_types::{Co2Detection, Measurement, DEFAULT_CO2_THRESHOLD_PPM};
//!
//! let m = Measurement::new(22.0, 45.0, 1200.0);
//! assert_eq!(m.co2_detection(DEFAULT_CO2_THRESHOLD_PPM), Co2Detection::Normal);
//! assert_eq!(m.to_string(), "Temp: 22°C, Hum: 45%, CO₂: 1200 ppm");
//! ```

pub mod error;
pub mod format;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use format::format_significant;
pub use types::{AccessoryInfo, Co2Detection, DEFAULT_CO2_THRESHOLD_PPM, Measurement};
