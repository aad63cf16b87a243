//! National Weather Service forecast client
//!
//! Two requests per lookup: `/points/{lat},{lon}` resolves the gridpoint
//! forecast URL, which then returns the forecast periods.

use super::ForecastProvider;
use crate::error::{PredictorError, Result};
use crate::models::{Coordinates, ForecastPeriod};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_NWS_URL: &str = "https://api.weather.gov";

/// Configuration for the NWS client
#[derive(Debug, Clone)]
pub struct NwsConfig {
    pub base_url: String,
    /// NWS rejects requests without an identifying User-Agent
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for NwsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_NWS_URL.to_string(),
            user_agent: format!("launchcast/{} (ops@example.com)", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PointsResponse {
    properties: PointsProperties,
}

#[derive(Debug, Deserialize)]
struct PointsProperties {
    forecast: String,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    properties: ForecastProperties,
}

#[derive(Debug, Deserialize)]
struct ForecastProperties {
    periods: Vec<ForecastPeriod>,
}

/// HTTP forecast provider backed by api.weather.gov
pub struct NwsClient {
    client: Client,
    base_url: Url,
}

impl NwsClient {
    pub fn new(config: NwsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| PredictorError::Forecast(format!("failed to create HTTP client: {}", e)))?;
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| PredictorError::Forecast(format!("invalid forecast URL '{}': {}", config.base_url, e)))?;
        // `join` replaces the last path segment unless the path ends in '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { client, base_url })
    }

    pub fn points_url(&self, coordinates: Coordinates) -> Result<Url> {
        self.base_url
            .join(&format!("points/{},{}", coordinates.latitude, coordinates.longitude))
            .map_err(|e| PredictorError::Forecast(format!("invalid points path: {}", e)))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url.clone())
            .header("Accept", "application/geo+json")
            .send()
            .await
            .map_err(|e| PredictorError::Forecast(format!("GET {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = %status, "Forecast provider returned error");
            return Err(PredictorError::Forecast(format!("GET {} returned {}: {}", url, status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| PredictorError::Forecast(format!("unexpected response from {}: {}", url, e)))
    }
}

#[async_trait]
impl ForecastProvider for NwsClient {
    async fn periods(&self, coordinates: Coordinates) -> Result<Vec<ForecastPeriod>> {
        let points: PointsResponse = self.get_json(self.points_url(coordinates)?).await?;
        let forecast_url = Url::parse(&points.properties.forecast)
            .map_err(|e| PredictorError::Forecast(format!("invalid forecast URL: {}", e)))?;

        let forecast: ForecastResponse = self.get_json(forecast_url).await?;
        debug!(
            latitude = coordinates.latitude,
            longitude = coordinates.longitude,
            periods = forecast.properties.periods.len(),
            "Fetched forecast"
        );
        Ok(forecast.properties.periods)
    }
}
