//! Background sensor collector.
//!
//! Polls the sensor on a fixed interval and publishes each new reading to the
//! accessory characteristics. Sensor errors end the collector; a missing
//! measurement is only logged.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use co2bridge_core::{RetryConfig, SensorReader, Thresholds, with_retry_until};
use co2bridge_types::Measurement;

use crate::accessory::SensorCharacteristics;
use crate::config::SensorConfig;

/// Collector timing, threshold and retry settings.
#[derive(Debug, Clone)]
pub struct CollectorSettings {
    /// Time between polls.
    pub interval: Duration,
    /// CO₂ detected threshold.
    pub thresholds: Thresholds,
    /// Retry policy for failing sensor calls.
    pub retry: RetryConfig,
}

impl CollectorSettings {
    /// Settings with the default threshold and no retries.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            thresholds: Thresholds::default(),
            retry: RetryConfig::none(),
        }
    }

    /// Derive settings from the sensor configuration.
    pub fn from_config(config: &SensorConfig) -> Result<Self, CollectorError> {
        Ok(Self {
            interval: config.interval(),
            thresholds: config.thresholds()?,
            retry: config.retry(),
        })
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// A reading was fetched and written to the characteristics.
    Published(Measurement),
    /// The sensor had no new reading.
    NotReady,
}

/// Polls a sensor and publishes its readings.
pub struct Collector<S> {
    sensor: S,
    characteristics: Arc<dyn SensorCharacteristics>,
    settings: CollectorSettings,
}

impl<S: SensorReader> Collector<S> {
    /// Create a new collector.
    pub fn new(
        sensor: S,
        characteristics: Arc<dyn SensorCharacteristics>,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            sensor,
            characteristics,
            settings,
        }
    }

    /// Run one poll without waiting for the interval.
    pub async fn poll_once(&self) -> Result<PollOutcome, CollectorError> {
        self.poll(&CancellationToken::new()).await
    }

    /// Poll the sensor, abandoning retry waits once `shutdown` is cancelled.
    async fn poll(&self, shutdown: &CancellationToken) -> Result<PollOutcome, CollectorError> {
        let sensor = &self.sensor;
        let retry = &self.settings.retry;

        let ready = with_retry_until(retry, "has_measurement", shutdown.cancelled(), move || {
            sensor.has_measurement()
        })
        .await?;
        if !ready {
            warn!("Failed to get a measurement...");
            return Ok(PollOutcome::NotReady);
        }

        let measurement =
            with_retry_until(retry, "get_measurement", shutdown.cancelled(), move || {
                sensor.get_measurement()
            })
            .await?;
        measurement.validate().map_err(co2bridge_core::Error::from)?;

        self.publish(&measurement).await;
        info!("{}", measurement);
        Ok(PollOutcome::Published(measurement))
    }

    /// Write a reading to the characteristics.
    ///
    /// Write failures are logged and the remaining characteristics are still
    /// updated.
    async fn publish(&self, m: &Measurement) {
        let chars = &self.characteristics;
        let detected = self.settings.thresholds.evaluate(m);

        if let Err(e) = chars.set_current_temperature(m.temperature).await {
            warn!("{}", e);
        }
        if let Err(e) = chars.set_current_relative_humidity(m.humidity).await {
            warn!("{}", e);
        }
        if let Err(e) = chars.set_carbon_dioxide_detected(detected).await {
            warn!("{}", e);
        }
        if let Err(e) = chars.set_carbon_dioxide_level(m.co2).await {
            warn!("{}", e);
        }
    }

    /// Poll until cancelled or until the sensor fails.
    ///
    /// Each cycle waits for the interval first, so the sensor has time to
    /// produce its first reading. A sensor call in progress is finished before
    /// cancellation is observed, but a retry wait is cut short. The sensor is
    /// stopped on every exit path.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), CollectorError> {
        info!(
            "Starting collector (interval: {}s, CO₂ threshold: {} ppm)",
            self.settings.interval.as_secs(),
            self.settings.thresholds.config().detected_above
        );

        let result = loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Collector cancelled");
                    break Ok(());
                }
                _ = sleep(self.settings.interval) => {}
            }

            if let Err(e) = self.poll(&shutdown).await {
                if shutdown.is_cancelled() {
                    debug!("Collector cancelled during retry: {}", e);
                    break Ok(());
                }
                error!("Sensor failure: {}", e);
                break Err(e);
            }
        };

        self.release().await;
        result
    }

    async fn release(self) {
        if let Err(e) = self.sensor.stop_measurements().await {
            warn!("Failed to stop sensor measurements: {}", e);
        }
        info!("Collector stopped");
    }
}

impl<S: SensorReader + 'static> Collector<S> {
    /// Run the collector on a background task.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<Result<(), CollectorError>> {
        tokio::spawn(self.run(shutdown))
    }
}

/// Collector errors.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Sensor error: {0}")]
    Sensor(#[from] co2bridge_core::Error),
}
