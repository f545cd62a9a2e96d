//! Open-Meteo current-conditions client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use meteopin_core::{NetworkError, ReqwestErrorExt, WeatherConfig};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::types::{ConditionInfo, WeatherSnapshot, UNKNOWN_CONDITION};

const FORECAST_PATH: &str = "/v1/forecast";
const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,wind_speed_10m,weather_code";
const USER_AGENT: &str = concat!("meteopin/", env!("CARGO_PKG_VERSION"));

/// Anything that can produce current conditions for a coordinate.
///
/// Implementations never touch widgets; callers own the write-back.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot, NetworkError>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: f64,
    relative_humidity_2m: i32,
    wind_speed_10m: f64,
    #[serde(default)]
    weather_code: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
}

impl WeatherProvider {
    /// Create a provider against `base_url` (e.g. `https://api.open-meteo.com`).
    ///
    /// With `timeout` unset requests use the client default, which never
    /// times out.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, NetworkError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| e.into_network_error())?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self, NetworkError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    async fn request(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot, NetworkError> {
        let url = format!("{}{}", self.base_url, FORECAST_PATH);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("wind_speed_unit", "ms".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .map_err(|e| e.into_network_error())?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NetworkError::ServerError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(|e| e.into_network_error())?;
        let parsed: ForecastResponse = serde_json::from_str(&body)
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()))?;

        let current = parsed.current;
        let condition = current
            .weather_code
            .map_or(UNKNOWN_CONDITION, ConditionInfo::from_wmo_code);
        Ok(WeatherSnapshot::from_condition(
            current.temperature_2m,
            current.relative_humidity_2m,
            current.wind_speed_10m,
            condition,
        ))
    }
}

#[async_trait]
impl WeatherSource for WeatherProvider {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, latitude: f64, longitude: f64) -> Result<WeatherSnapshot, NetworkError> {
        match self.request(latitude, longitude).await {
            Ok(snapshot) => {
                tracing::debug!(
                    "Fetched weather: {}°C, {}",
                    snapshot.temperature,
                    snapshot.description
                );
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!("Weather fetch failed for {}, {}: {}", latitude, longitude, e);
                Err(e)
            }
        }
    }
}
