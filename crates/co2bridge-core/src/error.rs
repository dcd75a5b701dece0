//! Error types for co2bridge-core.
//!
//! This module defines all error types that can occur when opening the I2C
//! bus and talking to the SCD30.
//!
//! # Error Recovery Strategies
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::Sensor`] | Retry if a retry policy is configured, otherwise fatal | Bus glitches can be transient |
//! | [`Error::InvalidMeasurement`] | Fatal | Corrupt data from the sensor |
//! | [`Error::InvalidBus`] | Fatal | Fix the `--i2c` option and restart |
//! | [`Error::Platform`] | Fatal | No usable I2C subsystem |
//! | [`Error::BusOpen`] | Fatal | Missing device node or permissions |
//! | [`Error::SensorOpen`] | Fatal | Sensor absent or not responding |
//! | [`Error::InvalidConfig`] | Fatal | Fix configuration and restart |
//!
//! The default policy of the bridge is fail-fast: every error ends the
//! process. See [`crate::RetryConfig`] for the opt-in bounded retry.

use thiserror::Error;

/// Errors that can occur when communicating with the sensor.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The I2C bus identifier could not be resolved to a device node.
    #[error("Invalid I2C bus '{bus}': {reason}")]
    InvalidBus {
        /// The identifier as given by the user.
        bus: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The host I/O layer could not be initialized.
    #[error("Platform initialization failed: {0}")]
    Platform(String),

    /// Opening the I2C device node failed.
    #[error("Failed to open I2C bus {path}: {reason}")]
    BusOpen {
        /// Device node path.
        path: String,
        /// Underlying driver message.
        reason: String,
    },

    /// The sensor did not accept its initial configuration.
    #[error("Failed to open sensor: {0}")]
    SensorOpen(String),

    /// A sensor command failed on the bus.
    #[error("Sensor operation '{operation}' failed: {reason}")]
    Sensor {
        /// The command that failed.
        operation: &'static str,
        /// Underlying driver message.
        reason: String,
    },

    /// The sensor returned a value that cannot be published.
    #[error(transparent)]
    InvalidMeasurement(#[from] co2bridge_types::ParseError),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a sensor command error.
    pub fn sensor(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Sensor {
            operation,
            reason: reason.into(),
        }
    }

    /// Create an invalid bus error.
    pub fn invalid_bus(bus: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBus {
            bus: bus.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

/// Result type alias using co2bridge-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
