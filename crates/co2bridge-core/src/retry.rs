//! Bounded retry for sensor operations.
//!
//! The bridge is fail-fast by default: [`RetryConfig::default`] performs no
//! retries, so the first sensor error is returned unchanged. Deployments on a
//! noisy bus can opt into a small number of retries with exponential backoff.
//!
//! # Example
//!
//! ```
//! use co2bridge_core::{Error, RetryConfig, with_retry};
//!
//! # async fn example() -> Result<(), Error> {
//! let config = RetryConfig::new(3);
//!
//! let ready = with_retry(&config, "has_measurement", || async {
//!     // Your sensor call here
//!     Ok::<_, Error>(true)
//! }).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 means no retries).
    pub max_retries: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries (for exponential backoff).
    pub max_delay: Duration,
    /// Backoff multiplier (1.0 = constant delay, 2.0 = double each time).
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryConfig {
    /// Retry up to `max_retries` times with the standard backoff.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// No retries.
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Whether this configuration retries at all.
    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Set maximum number of retries.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set initial delay.
    #[must_use]
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Calculate delay for a given attempt number.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.jitter {
            // Up to 25% jitter
            let jitter_factor = 1.0 + (rand::rng().random::<f64>() * 0.25);
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay)
    }
}

/// Execute an async operation with retry logic.
///
/// Non-retryable errors (see [`is_retryable`]) are returned immediately.
/// Otherwise the last error is returned once all attempts are used.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry_until(config, operation_name, std::future::pending(), operation).await
}

/// Like [`with_retry`], but gives up waiting between attempts once `stop`
/// completes.
///
/// An attempt already running is never interrupted. If `stop` completes
/// during a backoff wait, the error from the last attempt is returned.
pub async fn with_retry_until<F, Fut, T, C>(
    config: &RetryConfig,
    operation_name: &str,
    stop: C,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
    C: Future<Output = ()>,
{
    tokio::pin!(stop);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!("{} succeeded after {} retries", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) => {
                if !is_retryable(&e) || attempt >= config.max_retries {
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}, retrying in {:?}",
                    operation_name,
                    attempt + 1,
                    config.max_retries + 1,
                    e,
                    delay
                );
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = &mut stop => {
                        debug!("{} retry abandoned", operation_name);
                        return Err(e);
                    }
                }
                attempt += 1;
            }
        }
    }
}

/// Check if an error is worth retrying.
pub fn is_retryable(error: &Error) -> bool {
    match error {
        // Bus transfers can fail transiently (clock stretching, EMI)
        Error::Sensor { .. } => true,
        // Corrupt values are reported as-is
        Error::InvalidMeasurement(_) => false,
        // Setup errors need operator action
        Error::InvalidBus { .. } => false,
        Error::Platform(_) => false,
        Error::BusOpen { .. } => false,
        Error::SensorOpen(_) => false,
        Error::InvalidConfig(_) => false,
    }
}
