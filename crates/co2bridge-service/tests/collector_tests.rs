//! Collector tests against the mock sensor and in-memory characteristics.
//!
//! Time is paused, so interval sleeps complete as soon as the runtime is idle.

use std::sync::Arc;
use std::time::Duration;

use co2bridge_core::{
    Co2Detection, MockSensor, MockSensorBuilder, MockStep, RetryConfig, SensorReader,
};
use co2bridge_service::{
    Collector, CollectorError, CollectorSettings, MemoryCharacteristics, PollOutcome,
};
use co2bridge_types::Measurement;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

const INTERVAL: Duration = Duration::from_secs(5);

fn collector(
    sensor: &Arc<MockSensor>,
    chars: &Arc<MemoryCharacteristics>,
) -> Collector<Arc<MockSensor>> {
    Collector::new(
        Arc::clone(sensor),
        chars.clone(),
        CollectorSettings::new(INTERVAL),
    )
}

#[tokio::test]
async fn test_detected_only_above_threshold() {
    let sensor = Arc::new(
        MockSensorBuilder::new()
            .ready(21.0, 40.0, 1500.0)
            .ready(21.0, 40.0, 1500.5)
            .build(),
    );
    let chars = MemoryCharacteristics::shared();
    let collector = collector(&sensor, &chars);

    collector.poll_once().await.unwrap();
    let values = chars.values().await;
    assert_eq!(values.co2_detected, Some(Co2Detection::Normal));
    assert_eq!(values.co2_level, Some(1500.0));

    collector.poll_once().await.unwrap();
    let values = chars.values().await;
    assert_eq!(values.co2_detected, Some(Co2Detection::Abnormal));
    assert_eq!(values.co2_level, Some(1500.5));
}

#[tokio::test(start_paused = true)]
async fn test_scenario_readings_are_published_unsmoothed() {
    let sensor = Arc::new(
        MockSensorBuilder::new()
            .ready(22.0, 45.0, 1200.0)
            .ready(22.1, 44.0, 1600.0)
            .step(MockStep::NotReady)
            .build(),
    );
    let chars = MemoryCharacteristics::shared();
    let token = CancellationToken::new();
    let handle = collector(&sensor, &chars).spawn(token.clone());

    // Nothing happens before the first interval elapses
    sleep(Duration::from_secs(4)).await;
    assert_eq!(sensor.readiness_checks(), 0);

    sleep(Duration::from_secs(2)).await;
    let values = chars.values().await;
    assert_eq!(values.temperature, Some(22.0));
    assert_eq!(values.humidity, Some(45.0));
    assert_eq!(values.co2_detected, Some(Co2Detection::Normal));
    assert_eq!(values.co2_level, Some(1200.0));

    sleep(INTERVAL).await;
    let values = chars.values().await;
    assert_eq!(values.temperature, Some(22.1));
    assert_eq!(values.humidity, Some(44.0));
    assert_eq!(values.co2_detected, Some(Co2Detection::Abnormal));
    assert_eq!(values.co2_level, Some(1600.0));

    // A poll with no new reading leaves the previous values in place
    let writes = chars.writes();
    sleep(INTERVAL).await;
    assert_eq!(sensor.readiness_checks(), 3);
    assert_eq!(chars.writes(), writes);
    assert_eq!(chars.values().await.co2_level, Some(1600.0));

    token.cancel();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_not_ready_mutates_nothing() {
    let sensor = Arc::new(MockSensorBuilder::new().step(MockStep::NotReady).build());
    let chars = MemoryCharacteristics::shared();

    let outcome = collector(&sensor, &chars).poll_once().await.unwrap();

    assert_eq!(outcome, PollOutcome::NotReady);
    assert_eq!(sensor.fetches(), 0);
    assert_eq!(chars.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_readiness_error_stops_polling() {
    let sensor = Arc::new(
        MockSensorBuilder::new()
            .step(MockStep::ReadinessError("nack".to_string()))
            .build(),
    );
    sensor.start_measurements(5).await.unwrap();
    let chars = MemoryCharacteristics::shared();

    let result = collector(&sensor, &chars)
        .run(CancellationToken::new())
        .await;

    assert!(matches!(result, Err(CollectorError::Sensor(_))));
    assert_eq!(sensor.readiness_checks(), 1);
    assert_eq!(sensor.fetches(), 0);
    assert_eq!(sensor.stop_count(), 1);
    assert_eq!(chars.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_fetch_error_stops_polling() {
    let sensor = Arc::new(
        MockSensorBuilder::new()
            .step(MockStep::FetchError("crc mismatch".to_string()))
            .ready(22.0, 45.0, 800.0)
            .build(),
    );
    let chars = MemoryCharacteristics::shared();

    let result = collector(&sensor, &chars)
        .run(CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(sensor.fetches(), 1);
    assert_eq!(sensor.remaining_steps().await, 1);
    assert_eq!(chars.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_reading_is_fatal() {
    let sensor = Arc::new(
        MockSensorBuilder::new()
            .step(MockStep::Ready(Measurement::new(22.0, f32::NAN, 800.0)))
            .build(),
    );
    let chars = MemoryCharacteristics::shared();

    let result = collector(&sensor, &chars)
        .run(CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(CollectorError::Sensor(
            co2bridge_core::Error::InvalidMeasurement(_)
        ))
    ));
    assert_eq!(chars.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_rides_out_transient_error() {
    let sensor = Arc::new(
        MockSensorBuilder::new()
            .step(MockStep::ReadinessError("nack".to_string()))
            .ready(22.0, 45.0, 900.0)
            .build(),
    );
    let chars = MemoryCharacteristics::shared();
    let settings = CollectorSettings::new(INTERVAL).retry(RetryConfig::new(2).jitter(false));
    let collector = Collector::new(Arc::clone(&sensor), chars.clone(), settings);

    let outcome = collector.poll_once().await.unwrap();

    assert_eq!(
        outcome,
        PollOutcome::Published(Measurement::new(22.0, 45.0, 900.0))
    );
    assert_eq!(sensor.readiness_checks(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_cuts_retry_wait_short() {
    let sensor = Arc::new(
        MockSensorBuilder::new()
            .step(MockStep::ReadinessError("nack".to_string()))
            .step(MockStep::ReadinessError("nack".to_string()))
            .build(),
    );
    let chars = MemoryCharacteristics::shared();
    let retry = RetryConfig::new(3)
        .initial_delay(Duration::from_secs(60))
        .max_delay(Duration::from_secs(60))
        .jitter(false);
    let settings = CollectorSettings::new(INTERVAL).retry(retry);
    let token = CancellationToken::new();
    let start = tokio::time::Instant::now();
    let handle =
        Collector::new(Arc::clone(&sensor), chars.clone(), settings).spawn(token.clone());

    // First attempt failed, now waiting out the backoff
    sleep(Duration::from_secs(6)).await;
    assert_eq!(sensor.readiness_checks(), 1);

    token.cancel();
    handle.await.unwrap().unwrap();

    assert!(start.elapsed() < Duration::from_secs(60));
    assert_eq!(sensor.readiness_checks(), 1);
    assert_eq!(sensor.stop_count(), 1);
    assert_eq!(chars.writes(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_sensor() {
    let sensor = Arc::new(MockSensor::new());
    sensor.start_measurements(5).await.unwrap();
    let chars = MemoryCharacteristics::shared();
    let token = CancellationToken::new();
    let handle = collector(&sensor, &chars).spawn(token.clone());

    sleep(Duration::from_secs(12)).await;
    assert_eq!(sensor.readiness_checks(), 2);

    token.cancel();
    handle.await.unwrap().unwrap();

    assert!(!sensor.is_running());
    assert_eq!(sensor.stop_count(), 1);
    assert_eq!(sensor.readiness_checks(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_before_first_poll() {
    let sensor = Arc::new(MockSensor::new());
    let chars = MemoryCharacteristics::shared();
    let token = CancellationToken::new();
    token.cancel();

    collector(&sensor, &chars).run(token).await.unwrap();

    assert_eq!(sensor.readiness_checks(), 0);
    assert_eq!(sensor.stop_count(), 1);
    assert_eq!(chars.writes(), 0);
}
