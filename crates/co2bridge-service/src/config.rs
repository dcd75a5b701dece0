//! Bridge configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use co2bridge_core::scd30::{MAX_INTERVAL_SECS, MIN_INTERVAL_SECS};
use co2bridge_core::{RetryConfig, ThresholdConfig, Thresholds};
use co2bridge_types::{AccessoryInfo, DEFAULT_CO2_THRESHOLD_PPM};

/// Bridge configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pairing storage settings.
    pub storage: StorageConfig,
    /// Sensor settings.
    pub sensor: SensorConfig,
    /// Accessory identity and pairing settings.
    pub accessory: AccessoryConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Storage path is not empty
    /// - Measurement interval is within the SCD30 range (2s - 30 min)
    /// - CO₂ threshold is a positive finite number
    /// - Accessory name is not empty
    /// - Pairing PIN is eight digits and not a trivial sequence
    ///
    /// The I2C bus is not checked here; an empty bus fails when it is opened.
    ///
    /// # Example
    ///
    /// ```
    /// use co2bridge_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.storage.validate());
        errors.extend(self.sensor.validate());
        errors.extend(self.accessory.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Pairing storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding pairing state and accessory identity.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./db"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "storage path cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Sensor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// I2C bus identifier (`1`, `I2C1`, `/dev/i2c-1`).
    pub i2c: String,
    /// Seconds between readings.
    pub interval: u64,
    /// CO₂ level (ppm) above which the accessory reports CO₂ detected.
    pub co2_threshold: f32,
    /// Retries for a failing sensor call before it is fatal (0 = fail fast).
    pub max_retries: u32,
}

/// Default seconds between readings.
pub const DEFAULT_INTERVAL: u64 = 5;

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            i2c: String::new(),
            interval: DEFAULT_INTERVAL,
            co2_threshold: DEFAULT_CO2_THRESHOLD_PPM,
            max_retries: 0,
        }
    }
}

impl SensorConfig {
    /// Validate sensor configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.interval < u64::from(MIN_INTERVAL_SECS) {
            errors.push(ValidationError {
                field: "sensor.interval".to_string(),
                message: format!(
                    "interval {} is too short (minimum {} seconds)",
                    self.interval, MIN_INTERVAL_SECS
                ),
            });
        } else if self.interval > u64::from(MAX_INTERVAL_SECS) {
            errors.push(ValidationError {
                field: "sensor.interval".to_string(),
                message: format!(
                    "interval {} is too long (maximum {} seconds)",
                    self.interval, MAX_INTERVAL_SECS
                ),
            });
        }

        if !self.co2_threshold.is_finite() || self.co2_threshold <= 0.0 {
            errors.push(ValidationError {
                field: "sensor.co2_threshold".to_string(),
                message: format!(
                    "threshold {} must be a positive number of ppm",
                    self.co2_threshold
                ),
            });
        }

        errors
    }

    /// The interval as the sensor's native unit.
    ///
    /// Only meaningful after [`validate`](Self::validate) has passed.
    pub fn interval_secs(&self) -> u16 {
        u16::try_from(self.interval).unwrap_or(MAX_INTERVAL_SECS)
    }

    /// The interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Threshold evaluator for the CO₂ detected flag.
    pub fn thresholds(&self) -> co2bridge_core::Result<Thresholds> {
        Thresholds::new(ThresholdConfig {
            detected_above: self.co2_threshold,
        })
    }

    /// Retry policy for sensor calls.
    pub fn retry(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries)
    }
}

/// Accessory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessoryConfig {
    /// Name shown in the Home app.
    pub name: String,
    /// Eight-digit setup code, with or without dashes (`001-02-003`).
    pub pin: String,
}

/// Default setup code.
pub const DEFAULT_PIN: &str = "00102003";

impl Default for AccessoryConfig {
    fn default() -> Self {
        Self {
            name: AccessoryInfo::default().name,
            pin: DEFAULT_PIN.to_string(),
        }
    }
}

impl AccessoryConfig {
    /// Validate accessory configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push(ValidationError {
                field: "accessory.name".to_string(),
                message: "name cannot be empty".to_string(),
            });
        }

        if let Err(message) = parse_pin(&self.pin) {
            errors.push(ValidationError {
                field: "accessory.pin".to_string(),
                message,
            });
        }

        errors
    }

    /// Accessory identity derived from this configuration.
    pub fn info(&self) -> AccessoryInfo {
        AccessoryInfo::named(self.name.clone())
    }

    /// The setup code as digits.
    pub fn pin_digits(&self) -> Result<[u8; 8], ConfigError> {
        parse_pin(&self.pin).map_err(|message| {
            ConfigError::Validation(vec![ValidationError {
                field: "accessory.pin".to_string(),
                message,
            }])
        })
    }
}

/// Parse a HomeKit setup code.
///
/// Accepts eight digits, optionally grouped as `XXX-XX-XXX`. Codes made of a
/// single repeated digit and the ascending/descending runs are rejected, as
/// controllers refuse to pair with them.
pub fn parse_pin(pin: &str) -> Result<[u8; 8], String> {
    let digits: Vec<u8> = pin
        .chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect::<Option<_>>()
        .ok_or_else(|| format!("PIN '{}' must contain only digits and dashes", pin))?;

    let digits: [u8; 8] = digits
        .try_into()
        .map_err(|_| format!("PIN '{}' must have exactly 8 digits", pin))?;

    let all_same = digits.iter().all(|d| *d == digits[0]);
    if all_same || digits == [1, 2, 3, 4, 5, 6, 7, 8] || digits == [8, 7, 6, 5, 4, 3, 2, 1] {
        return Err(format!("PIN '{}' is too simple to pair with", pin));
    }

    Ok(digits)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `sensor.interval`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("co2bridge")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.storage.path, PathBuf::from("./db"));
        assert_eq!(config.sensor.i2c, "");
        assert_eq!(config.sensor.interval, 5);
        assert_eq!(config.sensor.co2_threshold, 1500.0);
        assert_eq!(config.sensor.max_retries, 0);
        assert_eq!(config.accessory.name, "SCD30 Sensor");
        assert_eq!(config.accessory.pin, "00102003");
    }

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_sensor_config_partial_toml() {
        let toml = r#"i2c = "1""#;
        let config: SensorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.i2c, "1");
        assert_eq!(config.interval, 5);
        assert_eq!(config.co2_threshold, 1500.0);
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [storage]
            path = "/var/lib/co2bridge"

            [sensor]
            i2c = "/dev/i2c-1"
            interval = 10
            co2_threshold = 1200.0
            max_retries = 2

            [accessory]
            name = "Office Air"
            pin = "314-15-926"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/co2bridge"));
        assert_eq!(config.sensor.i2c, "/dev/i2c-1");
        assert_eq!(config.sensor.interval, 10);
        assert_eq!(config.sensor.co2_threshold, 1200.0);
        assert_eq!(config.sensor.max_retries, 2);
        assert_eq!(config.accessory.name, "Office Air");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.sensor.i2c = "I2C1".to_string();
        config.sensor.interval = 30;
        config.accessory.name = "Bedroom".to_string();

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(loaded.sensor.i2c, "I2C1");
        assert_eq!(loaded.sensor.interval, 30);
        assert_eq!(loaded.accessory.name, "Bedroom");
        assert_eq!(loaded.storage.path, PathBuf::from("./db"));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_validated_rejects_bad_values() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        std::fs::write(&config_path, "[sensor]\ninterval = 1\n").unwrap();

        let result = Config::load_validated(&config_path);
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("co2bridge/config.toml"));
    }

    // ==========================================================================
    // Validation tests
    // ==========================================================================

    #[test]
    fn test_storage_path_validation() {
        let empty = StorageConfig {
            path: PathBuf::new(),
        };
        let errors = empty.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot be empty"));
    }

    #[test]
    fn test_interval_validation() {
        let mut config = SensorConfig::default();

        config.interval = 2;
        assert!(config.validate().is_empty());
        config.interval = 1800;
        assert!(config.validate().is_empty());

        config.interval = 1;
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("too short"));

        config.interval = 1801;
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("too long"));
    }

    #[test]
    fn test_threshold_validation() {
        let mut config = SensorConfig::default();
        config.co2_threshold = 0.0;
        assert_eq!(config.validate().len(), 1);
        config.co2_threshold = f32::NAN;
        assert_eq!(config.validate().len(), 1);
        config.co2_threshold = 800.0;
        assert!(config.validate().is_empty());
        assert_eq!(config.thresholds().unwrap().config().detected_above, 800.0);
    }

    #[test]
    fn test_empty_bus_is_not_a_validation_error() {
        let config = SensorConfig::default();
        assert!(config.i2c.is_empty());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_interval_conversions() {
        let config = SensorConfig::default();
        assert_eq!(config.interval_secs(), 5);
        assert_eq!(config.interval(), Duration::from_secs(5));
        assert!(!config.retry().is_enabled());
    }

    #[test]
    fn test_parse_pin() {
        assert_eq!(parse_pin("00102003").unwrap(), [0, 0, 1, 0, 2, 0, 0, 3]);
        assert_eq!(parse_pin("314-15-926").unwrap(), [3, 1, 4, 1, 5, 9, 2, 6]);

        assert!(parse_pin("1234567").unwrap_err().contains("exactly 8"));
        assert!(parse_pin("123456789").unwrap_err().contains("exactly 8"));
        assert!(parse_pin("1234abcd").unwrap_err().contains("only digits"));
        assert!(parse_pin("11111111").unwrap_err().contains("too simple"));
        assert!(parse_pin("12345678").unwrap_err().contains("too simple"));
        assert!(parse_pin("87654321").unwrap_err().contains("too simple"));
    }

    #[test]
    fn test_accessory_validation() {
        let config = AccessoryConfig {
            name: "  ".to_string(),
            pin: "00000000".to_string(),
        };
        let errors = config.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.field == "accessory.name"));
        assert!(errors.iter().any(|e| e.field == "accessory.pin"));
        assert!(config.pin_digits().is_err());
    }

    #[test]
    fn test_accessory_info() {
        let config = AccessoryConfig {
            name: "Kitchen".to_string(),
            pin: DEFAULT_PIN.to_string(),
        };
        let info = config.info();
        assert_eq!(info.name, "Kitchen");
        assert_eq!(info.manufacturer, "Sensirion");
    }

    #[test]
    fn test_validation_error_display() {
        let error = ValidationError {
            field: "sensor.interval".to_string(),
            message: "too short".to_string(),
        };
        assert_eq!(format!("{}", error), "sensor.interval: too short");
    }

    #[test]
    fn test_config_validation_collects_all_errors() {
        let mut config = Config::default();
        config.storage.path = PathBuf::new();
        config.sensor.interval = 0;
        config.accessory.pin = "1".to_string();

        let err = config.validate().unwrap_err();
        let display = format!("{}", err);
        assert!(display.contains("storage.path"));
        assert!(display.contains("sensor.interval"));
        assert!(display.contains("accessory.pin"));
    }
}
