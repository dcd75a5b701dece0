//! Error types for data validation in co2bridge-types.

use thiserror::Error;

/// Errors that can occur when validating sensor data.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum ParseError {
    /// A measurement field held a value that cannot be published.
    #[error("Invalid measurement: {field} is {value}")]
    InvalidMeasurement {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f32,
    },
}

/// Result type alias using co2bridge-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
