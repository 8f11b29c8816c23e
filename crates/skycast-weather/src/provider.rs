//! Visual Crossing timeline client.

use crate::types::{WeatherError, WeatherPayload};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Forecast window requested from the provider
const FORECAST_WINDOW: &str = "next7days";
const INCLUDE_SECTIONS: &str = "days,current,events";
const UNIT_GROUP: &str = "us";

#[derive(Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for WeatherProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherProvider")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl WeatherProvider {
    /// Create a provider for the given timeline endpoint.
    ///
    /// # Errors
    /// Returns `WeatherError::Transport` if the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| WeatherError::Transport(format!("Invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(WeatherError::Transport(format!(
                "Base URL cannot carry a path: {}",
                base_url
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Build the timeline URL for a city (the city is one encoded path segment).
    fn timeline_url(&self, city: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(city).push(FORECAST_WINDOW);
        }
        url.query_pairs_mut()
            .append_pair("unitGroup", UNIT_GROUP)
            .append_pair("include", INCLUDE_SECTIONS)
            .append_pair("key", &self.api_key)
            .append_pair("contentType", "json");
        url
    }

    /// Fetch the next seven days plus current conditions for `city`.
    ///
    /// Single attempt, no retry.
    ///
    /// # Errors
    /// - `WeatherError::Upstream` when the provider answers with a non-success status.
    /// - `WeatherError::Transport` on network failure, timeout, or an unreadable body.
    pub async fn fetch(&self, city: &str) -> Result<WeatherPayload, WeatherError> {
        let url = self.timeline_url(city);
        tracing::info!("Fetching weather for {}", city);

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = match body.trim() {
                "" => status.canonical_reason().unwrap_or("Unknown error").to_string(),
                text => text.to_string(),
            };
            tracing::warn!("Weather provider returned {} for {}: {}", status, city, message);
            return Err(WeatherError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        let payload: WeatherPayload = serde_json::from_slice(&bytes)
            .map_err(|e| WeatherError::Transport(format!("Invalid weather payload: {}", e)))?;

        tracing::debug!("Fetched {} forecast days for {}", payload.days.len(), city);
        Ok(payload)
    }
}
