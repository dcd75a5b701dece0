//! Sensirion SCD30 adapter.
//!
//! Wraps the blocking `scd30-interface` driver behind [`SensorReader`]. The
//! register protocol (CRC, command words, float decoding) lives in that crate;
//! this module only maps its calls and errors onto the bridge's vocabulary.
//!
//! Bus transfers are short (a few milliseconds), so they run inline on the
//! calling worker thread via [`tokio::task::block_in_place`]. The adapter
//! therefore requires the multi-threaded runtime.

use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use embedded_hal::i2c::I2c;
use scd30_interface::blocking::Scd30;
use scd30_interface::data::{DataStatus, MeasurementInterval};
use tracing::{debug, info};

use co2bridge_types::Measurement;

use crate::error::{Error, Result};
use crate::traits::SensorReader;

/// Minimum continuous measurement interval supported by the SCD30, in seconds.
pub const MIN_INTERVAL_SECS: u16 = 2;
/// Maximum continuous measurement interval supported by the SCD30, in seconds.
pub const MAX_INTERVAL_SECS: u16 = 1800;

/// An SCD30 on an I2C bus.
pub struct Scd30Sensor<I2C> {
    driver: Mutex<Scd30<I2C>>,
}

impl<I2C> fmt::Debug for Scd30Sensor<I2C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scd30Sensor").finish_non_exhaustive()
    }
}

impl<I2C> Scd30Sensor<I2C>
where
    I2C: I2c + Send,
    I2C::Error: fmt::Debug,
{
    /// Open the sensor on the given bus.
    ///
    /// The sensor is checked with a data-ready query so a missing or
    /// unpowered chip fails here rather than on the first poll.
    pub fn open(bus: I2C) -> Result<Self> {
        let mut driver = Scd30::new(bus);
        driver
            .is_data_ready()
            .map_err(|e| Error::SensorOpen(format!("no response from SCD30: {:?}", e)))?;
        debug!("SCD30 responded on the bus");

        Ok(Self {
            driver: Mutex::new(driver),
        })
    }

    fn with_driver<T, E, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        E: fmt::Debug,
        F: FnOnce(&mut Scd30<I2C>) -> std::result::Result<T, E>,
    {
        tokio::task::block_in_place(|| {
            let mut driver = self
                .driver
                .lock()
                .map_err(|_| Error::sensor(operation, "driver lock poisoned"))?;
            f(&mut driver).map_err(|e| Error::sensor(operation, format!("{:?}", e)))
        })
    }
}

#[async_trait]
impl<I2C> SensorReader for Scd30Sensor<I2C>
where
    I2C: I2c + Send,
    I2C::Error: fmt::Debug,
{
    async fn start_measurements(&self, interval_secs: u16) -> Result<()> {
        if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&interval_secs) {
            return Err(Error::invalid_config(format!(
                "measurement interval {}s outside SCD30 range {}-{}s",
                interval_secs, MIN_INTERVAL_SECS, MAX_INTERVAL_SECS
            )));
        }
        let interval = MeasurementInterval::try_from(interval_secs).map_err(|e| {
            Error::invalid_config(format!("measurement interval {}s: {:?}", interval_secs, e))
        })?;

        self.with_driver("set_measurement_interval", |d| {
            d.set_measurement_interval(interval)
        })?;
        self.with_driver("trigger_continuous_measurements", |d| {
            d.trigger_continuous_measurements(None)
        })?;

        info!("SCD30 continuous measurement started ({}s interval)", interval_secs);
        Ok(())
    }

    async fn has_measurement(&self) -> Result<bool> {
        let status = self.with_driver("has_measurement", |d| d.is_data_ready())?;
        Ok(matches!(status, DataStatus::Ready))
    }

    async fn get_measurement(&self) -> Result<Measurement> {
        let m = self.with_driver("get_measurement", |d| d.read_measurement())?;
        Ok(Measurement::new(m.temperature, m.humidity, m.co2_concentration))
    }

    async fn stop_measurements(&self) -> Result<()> {
        self.with_driver("stop_measurements", |d| d.stop_continuous_measurements())?;
        info!("SCD30 continuous measurement stopped");
        Ok(())
    }
}

/// Open the SCD30 on a Linux I2C bus.
#[cfg(target_os = "linux")]
pub fn open(bus: crate::platform::I2cBus) -> Result<Scd30Sensor<crate::platform::I2cBus>> {
    Scd30Sensor::open(bus)
}
