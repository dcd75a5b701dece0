//! Mock sensor implementation for testing.
//!
//! This module provides a mock SCD30 that can be used for unit testing
//! without an I2C bus.
//!
//! The [`MockSensor`] implements the [`SensorReader`] trait, allowing it to be
//! used interchangeably with the real sensor in generic code.
//!
//! # Features
//!
//! - **Scripted polls**: queue a sequence of [`MockStep`]s, one per readiness check
//! - **Failure injection**: make every operation fail with a bus error
//! - **Latency simulation**: add artificial delays to simulate slow transfers
//! - **Call accounting**: inspect how often each operation was invoked

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use co2bridge_types::Measurement;

use crate::error::{Error, Result};
use crate::traits::SensorReader;

/// Outcome of one scripted readiness check.
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    /// `has_measurement` reports false.
    NotReady,
    /// `has_measurement` reports true and the next fetch returns this value.
    Ready(Measurement),
    /// `has_measurement` fails with a bus error.
    ReadinessError(String),
    /// `has_measurement` reports true but the next fetch fails.
    FetchError(String),
}

/// A mock SCD30 for testing.
///
/// Once the script is exhausted, every readiness check reports true and the
/// fetch returns the current reading.
///
/// # Example
///
/// ```
/// use co2bridge_core::{MockSensor, MockStep, SensorReader};
/// use co2bridge_types::Measurement;
///
/// #[tokio::main]
/// async fn main() {
///     let sensor = MockSensor::new();
///     sensor.push_step(MockStep::NotReady).await;
///
///     assert!(!sensor.has_measurement().await.unwrap());
///     assert!(sensor.has_measurement().await.unwrap());
///     let m = sensor.get_measurement().await.unwrap();
///     assert_eq!(m, Measurement::new(22.5, 45.0, 800.0));
/// }
/// ```
pub struct MockSensor {
    current_reading: RwLock<Measurement>,
    script: Mutex<VecDeque<MockStep>>,
    pending: Mutex<Option<Result<Measurement>>>,
    started_interval: RwLock<Option<u16>>,
    running: AtomicBool,
    should_fail: AtomicBool,
    fail_message: RwLock<String>,
    /// Simulated operation latency in milliseconds (0 = no delay).
    latency_ms: AtomicU64,
    readiness_checks: AtomicU32,
    fetches: AtomicU32,
    stop_count: AtomicU32,
}

impl std::fmt::Debug for MockSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSensor")
            .field("running", &self.running.load(Ordering::Relaxed))
            .field("readiness_checks", &self.readiness_checks.load(Ordering::Relaxed))
            .field("fetches", &self.fetches.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSensor {
    /// Create a new mock sensor with default values.
    pub fn new() -> Self {
        Self::with_reading(Self::default_reading())
    }

    /// Create a mock sensor that returns the given reading.
    pub fn with_reading(reading: Measurement) -> Self {
        Self {
            current_reading: RwLock::new(reading),
            script: Mutex::new(VecDeque::new()),
            pending: Mutex::new(None),
            started_interval: RwLock::new(None),
            running: AtomicBool::new(false),
            should_fail: AtomicBool::new(false),
            fail_message: RwLock::new("Mock failure".to_string()),
            latency_ms: AtomicU64::new(0),
            readiness_checks: AtomicU32::new(0),
            fetches: AtomicU32::new(0),
            stop_count: AtomicU32::new(0),
        }
    }

    fn default_reading() -> Measurement {
        Measurement::new(22.5, 45.0, 800.0)
    }

    async fn simulate(&self, operation: &'static str) -> Result<()> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.should_fail.load(Ordering::Relaxed) {
            Err(Error::sensor(operation, self.fail_message.read().await.clone()))
        } else {
            Ok(())
        }
    }

    // --- Test control methods ---

    /// Append one scripted readiness check.
    pub async fn push_step(&self, step: MockStep) {
        self.script.lock().await.push_back(step);
    }

    /// Set the reading returned once the script is exhausted.
    pub async fn set_reading(&self, reading: Measurement) {
        *self.current_reading.write().await = reading;
    }

    /// Set CO2 level directly.
    pub async fn set_co2(&self, co2: f32) {
        self.current_reading.write().await.co2 = co2;
    }

    /// Make every operation fail.
    pub async fn set_should_fail(&self, fail: bool, message: Option<&str>) {
        self.should_fail.store(fail, Ordering::Relaxed);
        if let Some(msg) = message {
            *self.fail_message.write().await = msg.to_string();
        }
    }

    /// Set simulated latency for every operation.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of `has_measurement` calls.
    pub fn readiness_checks(&self) -> u32 {
        self.readiness_checks.load(Ordering::Relaxed)
    }

    /// Number of `get_measurement` calls.
    pub fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Number of `stop_measurements` calls.
    pub fn stop_count(&self) -> u32 {
        self.stop_count.load(Ordering::Relaxed)
    }

    /// Whether continuous measurement is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Interval passed to the last `start_measurements` call.
    pub async fn started_interval(&self) -> Option<u16> {
        *self.started_interval.read().await
    }

    /// Number of scripted steps not yet consumed.
    pub async fn remaining_steps(&self) -> usize {
        self.script.lock().await.len()
    }
}

#[async_trait]
impl SensorReader for MockSensor {
    async fn start_measurements(&self, interval_secs: u16) -> Result<()> {
        self.simulate("start_measurements").await?;
        *self.started_interval.write().await = Some(interval_secs);
        self.running.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn has_measurement(&self) -> Result<bool> {
        self.readiness_checks.fetch_add(1, Ordering::Relaxed);
        self.simulate("has_measurement").await?;

        let step = self.script.lock().await.pop_front();
        let mut pending = self.pending.lock().await;
        match step {
            Some(MockStep::NotReady) => Ok(false),
            Some(MockStep::Ready(m)) => {
                *pending = Some(Ok(m));
                Ok(true)
            }
            Some(MockStep::ReadinessError(reason)) => {
                Err(Error::sensor("has_measurement", reason))
            }
            Some(MockStep::FetchError(reason)) => {
                *pending = Some(Err(Error::sensor("get_measurement", reason)));
                Ok(true)
            }
            None => {
                *pending = Some(Ok(*self.current_reading.read().await));
                Ok(true)
            }
        }
    }

    async fn get_measurement(&self) -> Result<Measurement> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.simulate("get_measurement").await?;

        match self.pending.lock().await.take() {
            Some(result) => result,
            None => Ok(*self.current_reading.read().await),
        }
    }

    async fn stop_measurements(&self) -> Result<()> {
        self.stop_count.fetch_add(1, Ordering::Relaxed);
        self.running.store(false, Ordering::Relaxed);
        Ok(())
    }
}

/// Builder for creating mock sensors with custom settings.
#[derive(Debug, Clone)]
pub struct MockSensorBuilder {
    reading: Measurement,
    steps: Vec<MockStep>,
    latency: Duration,
}

impl Default for MockSensorBuilder {
    fn default() -> Self {
        Self {
            reading: MockSensor::default_reading(),
            steps: Vec::new(),
            latency: Duration::ZERO,
        }
    }
}

impl MockSensorBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the temperature.
    #[must_use]
    pub fn temperature(mut self, temp: f32) -> Self {
        self.reading.temperature = temp;
        self
    }

    /// Set the humidity.
    #[must_use]
    pub fn humidity(mut self, humidity: f32) -> Self {
        self.reading.humidity = humidity;
        self
    }

    /// Set the CO2 level.
    #[must_use]
    pub fn co2(mut self, co2: f32) -> Self {
        self.reading.co2 = co2;
        self
    }

    /// Append a scripted step.
    #[must_use]
    pub fn step(mut self, step: MockStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Append a ready measurement to the script.
    #[must_use]
    pub fn ready(self, temperature: f32, humidity: f32, co2: f32) -> Self {
        self.step(MockStep::Ready(Measurement::new(temperature, humidity, co2)))
    }

    /// Set simulated latency.
    #[must_use]
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Build the mock sensor.
    #[must_use]
    pub fn build(self) -> MockSensor {
        let mut sensor = MockSensor::with_reading(self.reading);
        sensor.set_latency(self.latency);
        *sensor.script.get_mut() = self.steps.into();
        sensor
    }
}
