use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::{Device, Farm, TelemetryReading};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: StatusCode, url: String },
}

/// Thin wrapper over the backend REST surface. One method per operation,
/// one round trip per call: no retries, no caching. Cheap to clone, so
/// worker threads take their own copy.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(ApiError::Status {
                status: resp.status(),
                url: resp.url().to_string(),
            })
        }
    }

    pub async fn get_farm(&self, farm_id: i64) -> Result<Farm, ApiError> {
        let resp = self.http.get(self.url(&format!("/farms/{farm_id}"))).send().await?;
        Ok(Self::check(resp)?.json().await?)
    }

    #[allow(dead_code)]
    pub async fn create_farm(&self, farm: &Farm) -> Result<Farm, ApiError> {
        let resp = self.http.post(self.url("/farms")).json(farm).send().await?;
        Ok(Self::check(resp)?.json().await?)
    }

    pub async fn update_farm(&self, farm_id: i64, farm: &Farm) -> Result<Farm, ApiError> {
        let resp = self
            .http
            .put(self.url(&format!("/farms/{farm_id}/edit")))
            .json(farm)
            .send()
            .await?;
        Ok(Self::check(resp)?.json().await?)
    }

    #[allow(dead_code)]
    pub async fn delete_farm(&self, farm_id: i64) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/farms/{farm_id}/delete")))
            .send()
            .await?;
        Self::check(resp)?;
        Ok(())
    }

    pub async fn list_devices(&self, farm_id: i64) -> Result<Vec<Device>, ApiError> {
        let resp = self
            .http
            .get(self.url(&format!("/farms/{farm_id}/devices")))
            .send()
            .await?;
        Ok(Self::check(resp)?.json().await?)
    }

    pub async fn create_device(&self, device: &Device) -> Result<Device, ApiError> {
        let resp = self.http.post(self.url("/devices")).json(device).send().await?;
        Ok(Self::check(resp)?.json().await?)
    }

    pub async fn delete_device(&self, device_id: &str) -> Result<(), ApiError> {
        let resp = self
            .http
            .delete(self.url(&format!("/devices/{device_id}/delete")))
            .send()
            .await?;
        Self::check(resp)?;
        Ok(())
    }

    /// Most recent reading for one device. A 404 means "no data yet" and
    /// maps to `Ok(None)`; every other failure is a real error.
    pub async fn latest_telemetry(
        &self,
        device_id: &str,
    ) -> Result<Option<TelemetryReading>, ApiError> {
        let resp = self
            .http
            .get(self.url(&format!("/telemetry-data/{device_id}/latest")))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(Self::check(resp)?.json().await?))
    }

    /// Readings for one device over [start, end]. `end` is optional and
    /// defaults to "now" on the server.
    pub async fn telemetry_by_period(
        &self,
        device_id: &str,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<TelemetryReading>, ApiError> {
        let mut query = vec![("start", start.to_rfc3339())];
        if let Some(end) = end {
            query.push(("end", end.to_rfc3339()));
        }
        let resp = self
            .http
            .get(self.url(&format!("/telemetry-data/{device_id}/period")))
            .query(&query)
            .send()
            .await?;
        Ok(Self::check(resp)?.json().await?)
    }
}
