//! co2bridge - SCD30 to HomeKit bridge.
//!
//! Run with: `cargo run -p co2bridge-service -- --i2c 1`

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::task::JoinError;
use tracing::{info, warn};

use co2bridge_core::SensorReader;
use co2bridge_service::{
    AccessoryServer, AppContext, Collector, CollectorError, CollectorSettings, Config,
    build_accessories, shutdown,
};

/// co2bridge - Publish SCD30 CO₂, temperature and humidity readings to HomeKit.
#[derive(Parser, Debug)]
#[command(name = "co2bridge")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for pairing state (overrides config, default ./db).
    #[arg(long, env = "CO2BRIDGE_DB")]
    db: Option<PathBuf>,

    /// I²C bus to use, e.g. `1` or `/dev/i2c-1` (overrides config).
    #[arg(long, env = "CO2BRIDGE_I2C")]
    i2c: Option<String>,

    /// The time in seconds between CO₂ readings (overrides config, default 5).
    #[arg(long, env = "CO2BRIDGE_INTERVAL")]
    interval: Option<u64>,

    /// HomeKit setup code, 8 digits (overrides config, default 00102003).
    #[arg(long)]
    pin: Option<String>,

    /// Accessory name shown in the Home app (overrides config).
    #[arg(long)]
    name: Option<String>,

    /// CO₂ level in ppm above which CO₂ is reported as detected (overrides config).
    #[arg(long)]
    co2_threshold: Option<f32>,

    /// Retries for a failing sensor read before exiting (overrides config).
    #[arg(long)]
    retries: Option<u32>,
}

/// Long flags that may also be spelled with a single dash (`-i2c 1`).
const SINGLE_DASH_FLAGS: &[&str] = &["db", "i2c", "interval"];

/// Rewrite `-db`, `-i2c` and `-interval` (and their `=value` forms) to the
/// double-dash spelling clap expects.
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(flag) = text.strip_prefix('-').filter(|rest| !rest.starts_with('-')) else {
                return arg;
            };
            let name = flag.split_once('=').map_or(flag, |(name, _)| name);
            if SINGLE_DASH_FLAGS.contains(&name) {
                OsString::from(format!("-{}", text))
            } else {
                arg
            }
        })
        .collect()
}

impl Args {
    /// Parse the process arguments.
    fn from_env() -> Self {
        Self::parse_from(normalize_args(std::env::args_os()))
    }

    /// Apply command line overrides to a loaded configuration.
    fn apply(self, config: &mut Config) {
        if let Some(db) = self.db {
            config.storage.path = db;
        }
        if let Some(i2c) = self.i2c {
            config.sensor.i2c = i2c;
        }
        if let Some(interval) = self.interval {
            config.sensor.interval = interval;
        }
        if let Some(threshold) = self.co2_threshold {
            config.sensor.co2_threshold = threshold;
        }
        if let Some(retries) = self.retries {
            config.sensor.max_retries = retries;
        }
        if let Some(pin) = self.pin {
            config.accessory.pin = pin;
        }
        if let Some(name) = self.name {
            config.accessory.name = name;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::from_env();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("co2bridge=info".parse()?)
                .add_directive("co2bridge_service=info".parse()?)
                .add_directive("co2bridge_core=info".parse()?)
                .add_directive("hap=warn".parse()?),
        )
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default().unwrap_or_else(|e| {
            warn!("Ignoring default configuration file: {}", e);
            Config::default()
        }),
    };
    args.apply(&mut config);
    config.validate()?;

    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    // Set up the HomeKit accessories
    let accessories = build_accessories(&config.accessory.info())?;
    let server = AccessoryServer::new(&config)
        .await
        .context("Failed to create accessory server")?;
    let characteristics = server.register(accessories).await?;

    let ctx = AppContext::new(config, Arc::new(characteristics));
    shutdown::spawn_signal_handler(ctx.shutdown.clone());

    // Set up the sensor
    let sensor = open_sensor(&ctx.config.sensor.i2c)?;
    sensor
        .start_measurements(ctx.config.sensor.interval_secs())
        .await
        .context("Failed to start measurements")?;

    let settings = CollectorSettings::from_config(&ctx.config.sensor)?;
    let mut collector = Collector::new(sensor, Arc::clone(&ctx.characteristics), settings)
        .spawn(ctx.shutdown.clone());

    // Serve until a signal arrives or the collector fails
    let served = tokio::select! {
        result = server.serve(ctx.shutdown.clone()) => result,
        joined = &mut collector => {
            ctx.request_shutdown();
            return collector_result(joined);
        }
    };

    // Let the collector release the sensor before exiting
    ctx.request_shutdown();
    let collected = collector_result(collector.await);
    served.context("Accessory server failed")?;
    collected?;

    info!("Shutdown complete");
    Ok(())
}

fn collector_result(joined: Result<Result<(), CollectorError>, JoinError>) -> anyhow::Result<()> {
    joined
        .context("Collector task panicked")?
        .context("Collector failed")
}

#[cfg(target_os = "linux")]
fn open_sensor(bus: &str) -> anyhow::Result<Box<dyn SensorReader>> {
    use co2bridge_core::{platform, scd30};

    let host = platform::init().context("Failed to initialize I2C host")?;
    let bus = host
        .open_bus(bus)
        .with_context(|| format!("Failed to open I2C bus '{}'", bus))?;
    let sensor = scd30::open(bus).context("Failed to open SCD30")?;
    Ok(Box::new(sensor))
}

#[cfg(not(target_os = "linux"))]
fn open_sensor(bus: &str) -> anyhow::Result<Box<dyn SensorReader>> {
    anyhow::bail!("I2C bus '{}' unavailable: the SCD30 driver requires Linux", bus)
}
