//! HomeKit bridge for a Sensirion SCD30 CO₂ sensor.
//!
//! This crate provides the `co2bridge` service that:
//! - Polls an SCD30 over I2C on a fixed interval
//! - Publishes temperature, humidity, CO₂ level and a CO₂ detected flag as
//!   HomeKit characteristics
//! - Serves the accessories over the HomeKit Accessory Protocol, keeping
//!   pairings in a local directory
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/co2bridge/config.toml`
//! if it exists. Command line flags override file values.
//!
//! ```toml
//! [storage]
//! path = "./db"
//!
//! [sensor]
//! i2c = "1"
//! interval = 5
//! co2_threshold = 1500.0
//! max_retries = 0
//!
//! [accessory]
//! name = "SCD30 Sensor"
//! pin = "00102003"
//! ```

pub mod accessory;
pub mod collector;
pub mod config;
pub mod server;
pub mod shutdown;
pub mod state;

pub use accessory::{
    AccessoryError, BridgeAccessories, CharacteristicValues, HapCharacteristics,
    MemoryCharacteristics, SensorCharacteristics, build_accessories,
};
pub use collector::{Collector, CollectorError, CollectorSettings, PollOutcome};
pub use config::{
    AccessoryConfig, Config, ConfigError, SensorConfig, StorageConfig, ValidationError,
};
pub use server::{AccessoryServer, ServerError};
pub use state::AppContext;
