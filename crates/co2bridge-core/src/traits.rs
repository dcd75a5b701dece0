//! Trait abstractions for sensor operations.
//!
//! This module provides the [`SensorReader`] trait that abstracts over the
//! real SCD30 on an I2C bus and mock sensors for testing.

use async_trait::async_trait;

use co2bridge_types::Measurement;

use crate::error::Result;

/// Trait abstracting a CO₂/temperature/humidity sensor running in
/// continuous measurement mode.
///
/// # Example
///
/// ```ignore
/// use co2bridge_core::{Result, SensorReader};
///
/// async fn print_reading<S: SensorReader>(sensor: &S) -> Result<()> {
///     if sensor.has_measurement().await? {
///         let m = sensor.get_measurement().await?;
///         println!("CO2: {} ppm", m.co2);
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SensorReader: Send + Sync {
    /// Start continuous measurement with the given interval in seconds.
    async fn start_measurements(&self, interval_secs: u16) -> Result<()>;

    /// Whether a new measurement is ready to be read.
    async fn has_measurement(&self) -> Result<bool>;

    /// Read the latest measurement.
    async fn get_measurement(&self) -> Result<Measurement>;

    /// Stop continuous measurement.
    ///
    /// The default implementation does nothing.
    async fn stop_measurements(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<S: SensorReader + ?Sized> SensorReader for std::sync::Arc<S> {
    async fn start_measurements(&self, interval_secs: u16) -> Result<()> {
        (**self).start_measurements(interval_secs).await
    }

    async fn has_measurement(&self) -> Result<bool> {
        (**self).has_measurement().await
    }

    async fn get_measurement(&self) -> Result<Measurement> {
        (**self).get_measurement().await
    }

    async fn stop_measurements(&self) -> Result<()> {
        (**self).stop_measurements().await
    }
}

#[async_trait]
impl<S: SensorReader + ?Sized> SensorReader for Box<S> {
    async fn start_measurements(&self, interval_secs: u16) -> Result<()> {
        (**self).start_measurements(interval_secs).await
    }

    async fn has_measurement(&self) -> Result<bool> {
        (**self).has_measurement().await
    }

    async fn get_measurement(&self) -> Result<Measurement> {
        (**self).get_measurement().await
    }

    async fn stop_measurements(&self) -> Result<()> {
        (**self).stop_measurements().await
    }
}
