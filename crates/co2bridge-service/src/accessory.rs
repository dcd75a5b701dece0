//! HomeKit accessory model.
//!
//! The bridge exposes one accessory per sensor service: temperature,
//! humidity, and CO₂ (with the optional level characteristic). The collector
//! writes readings through [`SensorCharacteristics`], which is implemented
//! both for the live `hap` accessories and for an in-memory model used by
//! tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use hap::HapType;
use hap::accessory::bridge::BridgeAccessory;
use hap::accessory::carbon_dioxide_sensor::CarbonDioxideSensorAccessory;
use hap::accessory::humidity_sensor::HumiditySensorAccessory;
use hap::accessory::temperature_sensor::TemperatureSensorAccessory;
use hap::accessory::{AccessoryInformation, HapAccessory};
use hap::characteristic::HapCharacteristic;
use hap::service::HapService;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use co2bridge_types::{AccessoryInfo, Co2Detection};

/// Accessory ids. The bridge must be 1.
pub const BRIDGE_AID: u64 = 1;
pub const TEMPERATURE_AID: u64 = 2;
pub const HUMIDITY_AID: u64 = 3;
pub const CO2_AID: u64 = 4;

/// Accessory model errors.
#[derive(Debug, thiserror::Error)]
pub enum AccessoryError {
    #[error("Failed to build accessory {name}: {reason}")]
    Build { name: String, reason: String },
    #[error("Accessory has no {0:?} service")]
    MissingService(HapType),
    #[error("Service has no {0:?} characteristic")]
    MissingCharacteristic(HapType),
    #[error("Failed to set {characteristic:?}: {reason}")]
    Write {
        characteristic: HapType,
        reason: String,
    },
}

/// Writable sensor characteristics of the bridge.
///
/// Each write is independent; a reader may observe a new temperature
/// alongside the previous CO₂ level.
#[async_trait]
pub trait SensorCharacteristics: Send + Sync {
    /// Set `CurrentTemperature` (°C).
    async fn set_current_temperature(&self, celsius: f32) -> Result<(), AccessoryError>;

    /// Set `CurrentRelativeHumidity` (%).
    async fn set_current_relative_humidity(&self, percent: f32) -> Result<(), AccessoryError>;

    /// Set `CarbonDioxideDetected`.
    async fn set_carbon_dioxide_detected(
        &self,
        detected: Co2Detection,
    ) -> Result<(), AccessoryError>;

    /// Set `CarbonDioxideLevel` (ppm).
    async fn set_carbon_dioxide_level(&self, ppm: f32) -> Result<(), AccessoryError>;
}

/// The accessories making up the bridge, ready to register with a server.
pub struct BridgeAccessories {
    pub bridge: BridgeAccessory,
    pub temperature: TemperatureSensorAccessory,
    pub humidity: HumiditySensorAccessory,
    pub co2: CarbonDioxideSensorAccessory,
}

impl std::fmt::Debug for BridgeAccessories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeAccessories").finish_non_exhaustive()
    }
}

fn information(info: &AccessoryInfo, name: String) -> AccessoryInformation {
    AccessoryInformation {
        name,
        manufacturer: info.manufacturer.clone(),
        model: info.model.clone(),
        serial_number: info.serial_number.clone(),
        firmware_revision: Some(info.firmware_revision.clone()),
        ..Default::default()
    }
}

fn build_error(name: &str, e: impl std::fmt::Display) -> AccessoryError {
    AccessoryError::Build {
        name: name.to_string(),
        reason: e.to_string(),
    }
}

/// Build the bridge and its three sensor accessories.
pub fn build_accessories(info: &AccessoryInfo) -> Result<BridgeAccessories, AccessoryError> {
    let bridge = BridgeAccessory::new(BRIDGE_AID, information(info, info.name.clone()))
        .map_err(|e| build_error("bridge", e))?;

    let temperature = TemperatureSensorAccessory::new(
        TEMPERATURE_AID,
        information(info, format!("{} Temperature", info.name)),
    )
    .map_err(|e| build_error("temperature", e))?;

    let humidity = HumiditySensorAccessory::new(
        HUMIDITY_AID,
        information(info, format!("{} Humidity", info.name)),
    )
    .map_err(|e| build_error("humidity", e))?;

    let co2 =
        CarbonDioxideSensorAccessory::new(CO2_AID, information(info, format!("{} CO₂", info.name)))
            .map_err(|e| build_error("carbon dioxide", e))?;

    Ok(BridgeAccessories {
        bridge,
        temperature,
        humidity,
        co2,
    })
}

/// Characteristics backed by accessories registered with a running server.
pub struct HapCharacteristics {
    temperature: hap::pointer::Accessory,
    humidity: hap::pointer::Accessory,
    co2: hap::pointer::Accessory,
}

impl HapCharacteristics {
    /// Wrap the pointers returned by `IpServer::add_accessory`.
    pub fn new(
        temperature: hap::pointer::Accessory,
        humidity: hap::pointer::Accessory,
        co2: hap::pointer::Accessory,
    ) -> Self {
        Self {
            temperature,
            humidity,
            co2,
        }
    }
}

async fn write(
    accessory: &hap::pointer::Accessory,
    service: HapType,
    characteristic: HapType,
    value: Value,
) -> Result<(), AccessoryError> {
    let mut accessory = accessory.lock().await;
    let service = accessory
        .get_mut_service(service)
        .ok_or(AccessoryError::MissingService(service))?;
    let target = service
        .get_mut_characteristic(characteristic)
        .ok_or(AccessoryError::MissingCharacteristic(characteristic))?;
    target
        .set_value(value)
        .await
        .map_err(|e| AccessoryError::Write {
            characteristic,
            reason: e.to_string(),
        })
}

#[async_trait]
impl SensorCharacteristics for HapCharacteristics {
    async fn set_current_temperature(&self, celsius: f32) -> Result<(), AccessoryError> {
        write(
            &self.temperature,
            HapType::TemperatureSensor,
            HapType::CurrentTemperature,
            json!(celsius),
        )
        .await
    }

    async fn set_current_relative_humidity(&self, percent: f32) -> Result<(), AccessoryError> {
        write(
            &self.humidity,
            HapType::HumiditySensor,
            HapType::CurrentRelativeHumidity,
            json!(percent),
        )
        .await
    }

    async fn set_carbon_dioxide_detected(
        &self,
        detected: Co2Detection,
    ) -> Result<(), AccessoryError> {
        write(
            &self.co2,
            HapType::CarbonDioxideSensor,
            HapType::CarbonDioxideDetected,
            json!(detected.as_u8()),
        )
        .await
    }

    async fn set_carbon_dioxide_level(&self, ppm: f32) -> Result<(), AccessoryError> {
        write(
            &self.co2,
            HapType::CarbonDioxideSensor,
            HapType::CarbonDioxideLevel,
            json!(ppm),
        )
        .await
    }
}

/// Snapshot of the values held by [`MemoryCharacteristics`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CharacteristicValues {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub co2_detected: Option<Co2Detection>,
    pub co2_level: Option<f32>,
}

/// In-memory characteristics for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryCharacteristics {
    values: RwLock<CharacteristicValues>,
    writes: AtomicU64,
    fail_writes: RwLock<Option<String>>,
}

impl MemoryCharacteristics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared instance.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Current values.
    pub async fn values(&self) -> CharacteristicValues {
        *self.values.read().await
    }

    /// Number of successful writes.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Make every subsequent write fail with `reason`, or succeed again with `None`.
    pub async fn set_fail_writes(&self, reason: Option<&str>) {
        *self.fail_writes.write().await = reason.map(str::to_string);
    }

    async fn apply(
        &self,
        characteristic: HapType,
        f: impl FnOnce(&mut CharacteristicValues),
    ) -> Result<(), AccessoryError> {
        if let Some(reason) = self.fail_writes.read().await.clone() {
            return Err(AccessoryError::Write {
                characteristic,
                reason,
            });
        }
        f(&mut *self.values.write().await);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl SensorCharacteristics for MemoryCharacteristics {
    async fn set_current_temperature(&self, celsius: f32) -> Result<(), AccessoryError> {
        self.apply(HapType::CurrentTemperature, |v| {
            v.temperature = Some(celsius)
        })
        .await
    }

    async fn set_current_relative_humidity(&self, percent: f32) -> Result<(), AccessoryError> {
        self.apply(HapType::CurrentRelativeHumidity, |v| {
            v.humidity = Some(percent)
        })
        .await
    }

    async fn set_carbon_dioxide_detected(
        &self,
        detected: Co2Detection,
    ) -> Result<(), AccessoryError> {
        self.apply(HapType::CarbonDioxideDetected, |v| {
            v.co2_detected = Some(detected)
        })
        .await
    }

    async fn set_carbon_dioxide_level(&self, ppm: f32) -> Result<(), AccessoryError> {
        self.apply(HapType::CarbonDioxideLevel, |v| v.co2_level = Some(ppm))
            .await
    }
}

#[async_trait]
impl<T: SensorCharacteristics + ?Sized> SensorCharacteristics for Arc<T> {
    async fn set_current_temperature(&self, celsius: f32) -> Result<(), AccessoryError> {
        (**self).set_current_temperature(celsius).await
    }

    async fn set_current_relative_humidity(&self, percent: f32) -> Result<(), AccessoryError> {
        (**self).set_current_relative_humidity(percent).await
    }

    async fn set_carbon_dioxide_detected(
        &self,
        detected: Co2Detection,
    ) -> Result<(), AccessoryError> {
        (**self).set_carbon_dioxide_detected(detected).await
    }

    async fn set_carbon_dioxide_level(&self, ppm: f32) -> Result<(), AccessoryError> {
        (**self).set_carbon_dioxide_level(ppm).await
    }
}
