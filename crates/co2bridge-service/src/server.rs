//! HomeKit accessory server.
//!
//! Wraps `hap`'s IP server with file-backed pairing storage. The first start
//! generates a random device id and saves it; later starts reuse it so paired
//! controllers keep recognising the bridge.

use std::path::{Path, PathBuf};

use hap::accessory::AccessoryCategory;
use hap::server::{IpServer, Server};
use hap::storage::{FileStorage, Storage};
use hap::{MacAddress, Pin};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::accessory::{AccessoryError, BridgeAccessories, HapCharacteristics};
use crate::config::Config;

/// Accessory server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to open pairing storage at {path}: {reason}")]
    Storage { path: PathBuf, reason: String },
    #[error("Invalid server configuration: {0}")]
    Config(String),
    #[error("Failed to register accessory {name}: {reason}")]
    Register { name: &'static str, reason: String },
    #[error(transparent)]
    Accessory(#[from] AccessoryError),
    #[error("Accessory server failed: {0}")]
    Serve(String),
}

/// A HomeKit IP accessory server.
pub struct AccessoryServer {
    server: IpServer,
}

impl AccessoryServer {
    /// Create a server using the storage and identity settings in `config`.
    pub async fn new(config: &Config) -> Result<Self, ServerError> {
        let path = &config.storage.path;
        let storage_err = |reason: String| ServerError::Storage {
            path: path.clone(),
            reason,
        };

        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| storage_err(e.to_string()))?;
        let mut storage = FileStorage::new(path)
            .await
            .map_err(|e| storage_err(e.to_string()))?;

        let pin = config
            .accessory
            .pin_digits()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        let hap_config =
            load_or_create_config(&mut storage, path, pin, &config.accessory.name).await?;
        info!(
            "Accessory server '{}' (device id {}), setup code {}",
            hap_config.name, hap_config.device_id, config.accessory.pin
        );

        let server = IpServer::new(hap_config, storage)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;
        Ok(Self { server })
    }

    /// Register the bridge accessories and return handles for writing readings.
    pub async fn register(
        &self,
        accessories: BridgeAccessories,
    ) -> Result<HapCharacteristics, ServerError> {
        let register_err = |name: &'static str| {
            move |e: hap::Error| ServerError::Register {
                name,
                reason: e.to_string(),
            }
        };

        self.server
            .add_accessory(accessories.bridge)
            .await
            .map_err(register_err("bridge"))?;
        let temperature = self
            .server
            .add_accessory(accessories.temperature)
            .await
            .map_err(register_err("temperature"))?;
        let humidity = self
            .server
            .add_accessory(accessories.humidity)
            .await
            .map_err(register_err("humidity"))?;
        let co2 = self
            .server
            .add_accessory(accessories.co2)
            .await
            .map_err(register_err("carbon dioxide"))?;

        debug!("Registered bridge with 3 sensor accessories");
        Ok(HapCharacteristics::new(temperature, humidity, co2))
    }

    /// Serve until the server fails or `shutdown` is cancelled.
    pub async fn serve(&self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let handle = self.server.run_handle();
        info!("Accessory server running");

        tokio::select! {
            result = handle => result.map_err(|e| ServerError::Serve(e.to_string())),
            _ = shutdown.cancelled() => {
                info!("Accessory server stopping");
                Ok(())
            }
        }
    }
}

/// File `FileStorage` keeps the server identity in.
const IDENTITY_FILE: &str = "config.json";

/// Load the saved server identity, or create and save a new one.
///
/// A new identity is only created when no identity file exists. An identity
/// file that cannot be read or parsed is an error and is left untouched, as
/// replacing it would unpair every controller.
///
/// The setup code and name always follow the current configuration; the
/// device id is only generated once.
async fn load_or_create_config(
    storage: &mut FileStorage,
    path: &Path,
    pin: [u8; 8],
    name: &str,
) -> Result<hap::Config, ServerError> {
    let pin = Pin::new(pin).map_err(|e| ServerError::Config(e.to_string()))?;
    let storage_err = |reason: String| ServerError::Storage {
        path: path.to_path_buf(),
        reason,
    };

    let identity = path.join(IDENTITY_FILE);
    let exists = tokio::fs::try_exists(&identity)
        .await
        .map_err(|e| storage_err(format!("cannot access {}: {}", identity.display(), e)))?;

    let config = if exists {
        let mut config = storage.load_config().await.map_err(|e| {
            storage_err(format!(
                "cannot load accessory identity from {}: {}",
                identity.display(),
                e
            ))
        })?;
        debug!("Loaded accessory server identity from {}", identity.display());
        config.redetermine_local_ip();
        config.pin = pin;
        config.name = name.to_string();
        config
    } else {
        info!("No pairing state found, creating a new accessory identity");
        hap::Config {
            pin,
            name: name.to_string(),
            device_id: random_device_id(),
            category: AccessoryCategory::Bridge,
            ..Default::default()
        }
    };

    storage
        .save_config(&config)
        .await
        .map_err(|e| storage_err(e.to_string()))?;
    Ok(config)
}

/// A random, locally administered unicast MAC address.
fn random_device_id() -> MacAddress {
    let mut bytes: [u8; 6] = rand::rng().random();
    bytes[0] = (bytes[0] | 0x02) & 0xfe;
    MacAddress::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIN: [u8; 8] = [0, 0, 1, 0, 2, 0, 0, 3];

    #[test]
    fn test_random_device_id_is_local_unicast() {
        for _ in 0..32 {
            let bytes = random_device_id().to_array();
            assert_eq!(bytes[0] & 0x02, 0x02, "locally administered bit");
            assert_eq!(bytes[0] & 0x01, 0x00, "unicast bit");
        }
    }

    #[tokio::test]
    async fn test_identity_is_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path()).await.unwrap();

        let first = load_or_create_config(&mut storage, dir.path(), PIN, "SCD30 Sensor")
            .await
            .unwrap();
        assert_eq!(first.name, "SCD30 Sensor");

        let second = load_or_create_config(&mut storage, dir.path(), PIN, "Office")
            .await
            .unwrap();
        assert_eq!(second.device_id, first.device_id);
        assert_eq!(second.name, "Office");
    }

    #[tokio::test]
    async fn test_corrupt_identity_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let identity = dir.path().join(IDENTITY_FILE);
        std::fs::write(&identity, "{ not json").unwrap();
        let mut storage = FileStorage::new(dir.path()).await.unwrap();

        let result = load_or_create_config(&mut storage, dir.path(), PIN, "SCD30 Sensor").await;

        assert!(matches!(result, Err(ServerError::Storage { .. })));
        assert_eq!(std::fs::read_to_string(&identity).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn test_first_run_writes_identity_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path()).await.unwrap();
        assert!(!dir.path().join(IDENTITY_FILE).exists());

        load_or_create_config(&mut storage, dir.path(), PIN, "SCD30 Sensor")
            .await
            .unwrap();

        assert!(dir.path().join(IDENTITY_FILE).exists());
    }
}
