use crate::api::{ApiClient, ApiError};
use crate::models::{Device, Farm, PollStatus, TelemetryReading};
use chrono::{Duration, Utc};
use futures::future;
use std::sync::{Arc, Mutex};
use std::thread;
use tracing::{debug, warn};

/// Keep successful latest fetches, drop the rest. A 404 ("device has not
/// reported yet") and a failed fetch are excluded alike; the result does not
/// distinguish them, only the log level does. This mirrors the backend's
/// observed contract, so callers see "missing data" rather than errors.
pub fn collect_latest(
    results: Vec<(String, Result<Option<TelemetryReading>, ApiError>)>,
) -> Vec<TelemetryReading> {
    let mut fresh = Vec::new();
    for (device_id, result) in results {
        match result {
            Ok(Some(reading)) => fresh.push(reading),
            Ok(None) => debug!(%device_id, "no telemetry reported yet"),
            Err(e) => warn!(%device_id, error = %e, "latest telemetry fetch failed"),
        }
    }
    fresh
}

/// Flatten per-device period fetches into one combined sequence. Failed
/// devices contribute zero rows.
pub fn merge_history(
    results: Vec<(String, Result<Vec<TelemetryReading>, ApiError>)>,
) -> Vec<TelemetryReading> {
    let mut combined = Vec::new();
    for (device_id, result) in results {
        match result {
            Ok(readings) => combined.extend(readings),
            Err(e) => warn!(%device_id, error = %e, "historical telemetry fetch failed"),
        }
    }
    combined
}

/// Fetch the latest reading for every known device concurrently, waiting for
/// all of them to settle, then atomically replace the shared collection.
pub fn refresh_latest(
    client: ApiClient,
    devices: Vec<Device>,
    latest: Arc<Mutex<Vec<TelemetryReading>>>,
    status: Arc<Mutex<PollStatus>>,
) {
    status.lock().unwrap().latest_in_flight = true;

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            let fetches = devices.iter().map(|device| {
                let client = &client;
                async move { (device.id.clone(), client.latest_telemetry(&device.id).await) }
            });
            let results = future::join_all(fetches).await;
            let fresh = collect_latest(results);

            *latest.lock().unwrap() = fresh;
        });

        status.lock().unwrap().latest_in_flight = false;
    });
}

/// Fetch each device's readings over the trailing window concurrently and
/// replace the shared historical collection with the flattened result.
pub fn refresh_history(
    client: ApiClient,
    devices: Vec<Device>,
    window_hours: i64,
    history: Arc<Mutex<Vec<TelemetryReading>>>,
    status: Arc<Mutex<PollStatus>>,
) {
    status.lock().unwrap().history_in_flight = true;

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            let start = Utc::now() - Duration::hours(window_hours);
            let fetches = devices.iter().map(|device| {
                let client = &client;
                async move {
                    (
                        device.id.clone(),
                        client.telemetry_by_period(&device.id, start, None).await,
                    )
                }
            });
            let results = future::join_all(fetches).await;
            let combined = merge_history(results);

            *history.lock().unwrap() = combined;
        });

        status.lock().unwrap().history_in_flight = false;
    });
}

/// Reload the farm settings. Failures leave the current value in place.
pub fn refresh_farm(
    client: ApiClient,
    farm_id: i64,
    farm: Arc<Mutex<Option<Farm>>>,
    status: Arc<Mutex<PollStatus>>,
) {
    status.lock().unwrap().farm_in_flight = true;

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            match client.get_farm(farm_id).await {
                Ok(loaded) => *farm.lock().unwrap() = Some(loaded),
                Err(e) => warn!(farm_id, error = %e, "farm fetch failed"),
            }
        });

        status.lock().unwrap().farm_in_flight = false;
    });
}

/// Reload the device working set from the backend. Failures leave the
/// current list in place.
pub fn refresh_devices(
    client: ApiClient,
    farm_id: i64,
    devices: Arc<Mutex<Vec<Device>>>,
    status: Arc<Mutex<PollStatus>>,
) {
    status.lock().unwrap().devices_in_flight = true;

    thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            match client.list_devices(farm_id).await {
                Ok(list) => *devices.lock().unwrap() = list,
                Err(e) => warn!(farm_id, error = %e, "device list fetch failed"),
            }
        });

        status.lock().unwrap().devices_in_flight = false;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::reading;
    use reqwest::StatusCode;

    fn fetch_error() -> ApiError {
        ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            url: "http://test/telemetry".to_string(),
        }
    }

    #[test]
    fn collect_latest_keeps_one_entry_per_successful_device() {
        let results = vec![
            ("tank-1".to_string(), Ok(Some(reading("tank-1")))),
            ("tank-2".to_string(), Err(fetch_error())),
            ("tank-3".to_string(), Ok(Some(reading("tank-3")))),
            ("tank-4".to_string(), Err(fetch_error())),
        ];
        let fresh = collect_latest(results);
        assert_eq!(fresh.len(), 2);
        let ids: Vec<&str> = fresh.iter().map(|r| r.device_id.as_str()).collect();
        assert_eq!(ids, vec!["tank-1", "tank-3"]);
    }

    #[test]
    fn collect_latest_drops_not_found_and_errors_alike() {
        let results = vec![
            ("tank-a".to_string(), Ok(Some(reading("tank-a")))),
            ("tank-b".to_string(), Ok(None)),
            ("tank-c".to_string(), Err(fetch_error())),
        ];
        let fresh = collect_latest(results);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].device_id, "tank-a");
    }

    #[test]
    fn merge_history_size_is_sum_of_successful_fetches() {
        let results = vec![
            (
                "tank-1".to_string(),
                Ok(vec![reading("tank-1"), reading("tank-1"), reading("tank-1")]),
            ),
            ("tank-2".to_string(), Err(fetch_error())),
            ("tank-3".to_string(), Ok(vec![reading("tank-3")])),
            ("tank-4".to_string(), Ok(vec![])),
        ];
        let combined = merge_history(results);
        assert_eq!(combined.len(), 4);
        assert_eq!(
            combined.iter().filter(|r| r.device_id == "tank-1").count(),
            3
        );
        assert_eq!(
            combined.iter().filter(|r| r.device_id == "tank-3").count(),
            1
        );
    }

    #[test]
    fn merge_history_of_all_failures_is_empty() {
        let results = vec![
            ("tank-1".to_string(), Err(fetch_error())),
            ("tank-2".to_string(), Err(fetch_error())),
        ];
        assert!(merge_history(results).is_empty());
    }
}
