//! Integration tests for co2bridge-core using the mock sensor.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use co2bridge_core::{
    Co2Detection, Error, MockSensor, MockSensorBuilder, MockStep, RetryConfig, SensorReader,
    Thresholds, with_retry,
};
use co2bridge_types::Measurement;

/// Read one value the way the bridge does: readiness check, then fetch.
async fn read_if_ready<S: SensorReader>(sensor: &S) -> co2bridge_core::Result<Option<Measurement>> {
    if !sensor.has_measurement().await? {
        return Ok(None);
    }
    let m = sensor.get_measurement().await?;
    m.validate()?;
    Ok(Some(m))
}

#[tokio::test]
async fn test_scenario_threshold_crossing() {
    let sensor = MockSensorBuilder::new()
        .ready(22.0, 45.0, 1200.0)
        .ready(22.1, 44.0, 1600.0)
        .build();
    let thresholds = Thresholds::default();

    let first = read_if_ready(&sensor).await.unwrap().unwrap();
    assert_eq!(thresholds.evaluate(&first), Co2Detection::Normal);
    assert_eq!(first.co2, 1200.0);

    let second = read_if_ready(&sensor).await.unwrap().unwrap();
    assert_eq!(thresholds.evaluate(&second), Co2Detection::Abnormal);
    assert_eq!(second.co2, 1600.0);
}

#[tokio::test]
async fn test_not_ready_skips_fetch() {
    let sensor = MockSensorBuilder::new().step(MockStep::NotReady).build();

    assert_eq!(read_if_ready(&sensor).await.unwrap(), None);
    assert_eq!(sensor.fetches(), 0);
}

#[tokio::test]
async fn test_invalid_measurement_is_rejected() {
    let sensor = MockSensorBuilder::new()
        .step(MockStep::Ready(Measurement::new(f32::NAN, 40.0, 500.0)))
        .build();

    let err = read_if_ready(&sensor).await.unwrap_err();
    assert!(matches!(err, Error::InvalidMeasurement(_)));
}

#[tokio::test]
async fn test_retry_recovers_from_transient_readiness_error() {
    let sensor = Arc::new(
        MockSensorBuilder::new()
            .step(MockStep::ReadinessError("nack".to_string()))
            .ready(21.0, 50.0, 700.0)
            .build(),
    );
    let config = RetryConfig::new(2)
        .initial_delay(Duration::from_millis(1))
        .jitter(false);

    let sensor_ref = &sensor;
    let ready = with_retry(&config, "has_measurement", move || sensor_ref.has_measurement())
        .await
        .unwrap();

    assert!(ready);
    assert_eq!(sensor.readiness_checks(), 2);
    assert_eq!(sensor.get_measurement().await.unwrap().co2, 700.0);
}

#[tokio::test]
async fn test_fail_fast_by_default() {
    let sensor = MockSensor::new();
    sensor.set_should_fail(true, Some("bus stuck")).await;

    let calls = AtomicU32::new(0);
    let result = with_retry(&RetryConfig::default(), "has_measurement", || {
        calls.fetch_add(1, Ordering::SeqCst);
        sensor.has_measurement()
    })
    .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_arc_sensor_shares_state() {
    let sensor = Arc::new(MockSensor::new());
    let shared: Arc<dyn SensorReader> = sensor.clone();

    shared.start_measurements(5).await.unwrap();
    assert!(sensor.is_running());
    assert_eq!(sensor.started_interval().await, Some(5));

    shared.stop_measurements().await.unwrap();
    assert!(!sensor.is_running());
}
