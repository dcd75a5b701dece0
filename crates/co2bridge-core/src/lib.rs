//! Sensor access for the co2bridge SCD30 HomeKit bridge.
//!
//! This crate provides the sensor half of the bridge: opening the I2C bus,
//! driving a Sensirion SCD30 in continuous measurement mode, and deciding the
//! CO₂ "detected" state from a reading.
//!
//! # Features
//!
//! - **Bus resolution**: accept `1`, `I2C1`, `i2c-1` or `/dev/i2c-1`
//! - **Sensor abstraction**: [`SensorReader`] over the real chip and [`MockSensor`]
//! - **Thresholding**: [`Thresholds`] for the CO₂ detected flag
//! - **Opt-in retries**: [`RetryConfig`] and [`with_retry`], fail-fast by default
//!
//! # Quick Start
//!
//! ```no_run
//! use co2bridge_core::{SensorReader, platform, scd30};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let host = platform::init()?;
//!     let bus = host.open_bus("1")?;
//!     let sensor = scd30::open(bus)?;
//!     sensor.start_measurements(5).await?;
//!
//!     if sensor.has_measurement().await? {
//!         println!("{}", sensor.get_measurement().await?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod mock;
pub mod platform;
pub mod retry;
pub mod scd30;
pub mod thresholds;
pub mod traits;

pub use error::{Error, Result};
pub use mock::{MockSensor, MockSensorBuilder, MockStep};
pub use platform::Host;
pub use retry::{RetryConfig, is_retryable, with_retry, with_retry_until};
pub use scd30::Scd30Sensor;
pub use thresholds::{ThresholdConfig, Thresholds};
pub use traits::SensorReader;

// Re-export from co2bridge-types
pub use co2bridge_types::{AccessoryInfo, Co2Detection, DEFAULT_CO2_THRESHOLD_PPM, Measurement};
