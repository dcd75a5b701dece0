//! Application context shared between the server, collector and signal task.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::accessory::SensorCharacteristics;
use crate::config::Config;

/// Everything the running bridge shares across tasks.
///
/// The shutdown token is cancelled once, by the signal handler or by a fatal
/// collector error, and never reset.
#[derive(Clone)]
pub struct AppContext {
    /// Validated configuration.
    pub config: Arc<Config>,
    /// Cancelled when the bridge should stop.
    pub shutdown: CancellationToken,
    /// Where the collector publishes readings.
    pub characteristics: Arc<dyn SensorCharacteristics>,
}

impl AppContext {
    pub fn new(config: Config, characteristics: Arc<dyn SensorCharacteristics>) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
            characteristics,
        }
    }

    /// Request shutdown of every task holding this context.
    pub fn request_shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}
