//! Host I/O initialization and I2C bus resolution.
//!
//! The SCD30 hangs off a Linux `i2c-dev` node. Users name the bus the way
//! their board documentation does, so several spellings are accepted:
//!
//! | Identifier | Resolves to |
//! |------------|-------------|
//! | `1` | `/dev/i2c-1` |
//! | `I2C1`, `i2c1`, `i2c-1` | `/dev/i2c-1` |
//! | `/dev/i2c-1` | `/dev/i2c-1` |
//!
//! An empty identifier is rejected; there is no default bus.
//!
//! # Usage
//!
//! ```ignore
//! use co2bridge_core::platform;
//!
//! let host = platform::init()?;
//! let bus = host.open_bus("1")?;
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Directory holding the `i2c-dev` nodes.
pub const DEV_DIR: &str = "/dev";

/// Handle to an open I2C bus.
#[cfg(target_os = "linux")]
pub type I2cBus = linux_embedded_hal::I2cdev;

/// Initialized host I/O layer.
#[derive(Debug, Clone)]
pub struct Host {
    dev_dir: PathBuf,
    buses: Vec<PathBuf>,
}

/// Initialize host I/O by enumerating the I2C adapters under [`DEV_DIR`].
pub fn init() -> Result<Host> {
    Host::init_in(DEV_DIR)
}

impl Host {
    /// Initialize host I/O using a custom device directory.
    pub fn init_in(dev_dir: impl AsRef<Path>) -> Result<Self> {
        if !cfg!(target_os = "linux") {
            return Err(Error::Platform(
                "I2C access requires Linux i2c-dev".to_string(),
            ));
        }

        let dev_dir = dev_dir.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&dev_dir).map_err(|e| {
            Error::Platform(format!("cannot read {}: {}", dev_dir.display(), e))
        })?;

        let mut buses: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("i2c-"))
            .map(|entry| entry.path())
            .collect();
        buses.sort();

        if buses.is_empty() {
            warn!(
                "No I2C adapters found in {} (is the i2c-dev module loaded?)",
                dev_dir.display()
            );
        } else {
            debug!("Found I2C adapters: {:?}", buses);
        }

        Ok(Self { dev_dir, buses })
    }

    /// I2C adapter nodes found at initialization.
    pub fn buses(&self) -> &[PathBuf] {
        &self.buses
    }

    /// Resolve a bus identifier to a device node under this host's device directory.
    pub fn resolve(&self, bus: &str) -> Result<PathBuf> {
        resolve_bus_path_in(&self.dev_dir, bus)
    }

    /// Open the named I2C bus.
    #[cfg(target_os = "linux")]
    pub fn open_bus(&self, bus: &str) -> Result<I2cBus> {
        let path = self.resolve(bus)?;

        if path.starts_with(&self.dev_dir) && !self.buses.contains(&path) {
            warn!(
                "{} was not present at startup; available: {:?}",
                path.display(),
                self.buses
            );
        }

        debug!("Opening I2C bus {}", path.display());
        linux_embedded_hal::I2cdev::new(&path).map_err(|e| Error::BusOpen {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Resolve a bus identifier to a device node under [`DEV_DIR`].
pub fn resolve_bus_path(bus: &str) -> Result<PathBuf> {
    resolve_bus_path_in(Path::new(DEV_DIR), bus)
}

fn resolve_bus_path_in(dev_dir: &Path, bus: &str) -> Result<PathBuf> {
    let bus = bus.trim();
    if bus.is_empty() {
        return Err(Error::invalid_bus(bus, "bus identifier is empty"));
    }

    if bus.starts_with('/') {
        return Ok(PathBuf::from(bus));
    }

    let lower = bus.to_ascii_lowercase();
    let number = lower
        .strip_prefix("i2c")
        .map(|rest| rest.strip_prefix('-').unwrap_or(rest))
        .unwrap_or(&lower);

    match number.parse::<u32>() {
        Ok(n) => Ok(dev_dir.join(format!("i2c-{}", n))),
        Err(_) => Err(Error::invalid_bus(
            bus,
            "expected a bus number, I2C<n>, or a device path",
        )),
    }
}
