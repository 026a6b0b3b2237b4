use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::{fmt::Debug, time::Duration};

use crate::Config;

const REQUEST_TIMEOUT_SECS: u64 = 30;
pub(crate) const USER_AGENT: &str = concat!("weather-checks/", env!("CARGO_PKG_VERSION"));

/// Status and body of a current-weather call, as returned by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWeatherResponse {
    pub status: u16,
    pub body: String,
}

impl RawWeatherResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.body)
    }
}

/// The remote calls the checks depend on. Implemented over HTTP by
/// [`HttpWeatherClient`]; tests substitute their own.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    /// Current weather for `city`. A non-200 status is returned, not raised.
    async fn fetch_current_weather(&self, city: &str) -> Result<RawWeatherResponse>;

    /// City names known for `country`; empty when the service has none.
    async fn fetch_cities_for_country(&self, country: &str) -> Result<Vec<String>>;

    /// Site path of the weather page for `city`, e.g. `/weather/uk/london`.
    async fn resolve_city_path(&self, city: &str) -> Result<Option<String>>;
}

#[derive(Debug, Clone)]
pub struct HttpWeatherClient {
    base_url: String,
    api_key: String,
    units: Option<String>,
    cities_url: String,
    completion_url: String,
    http: Client,
}

impl HttpWeatherClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: config.api.base_url.clone(),
            api_key: config.api.api_key.clone(),
            units: config.api.units.clone(),
            cities_url: config.endpoints.cities_url.clone(),
            completion_url: config.endpoints.completion_url.clone(),
            http,
        })
    }
}

#[async_trait]
impl WeatherSource for HttpWeatherClient {
    async fn fetch_current_weather(&self, city: &str) -> Result<RawWeatherResponse> {
        let mut query = vec![("q", city), ("appid", self.api_key.as_str())];
        if let Some(units) = &self.units {
            query.push(("units", units.as_str()));
        }

        let res = self
            .http
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .with_context(|| format!("Failed to send current weather request for {city}"))?;

        let status = res.status().as_u16();
        let body = res
            .text()
            .await
            .context("Failed to read current weather response body")?;

        tracing::debug!("Current weather for {city}: status {status}");

        Ok(RawWeatherResponse { status, body })
    }

    async fn fetch_cities_for_country(&self, country: &str) -> Result<Vec<String>> {
        let res = self
            .http
            .post(&self.cities_url)
            .form(&[("country", country)])
            .send()
            .await
            .with_context(|| format!("Failed to send cities request for {country}"))?;

        let status = res.status();
        let body = res.text().await.context("Failed to read cities response body")?;

        if !status.is_success() {
            tracing::warn!(
                "Cities request for {country} failed with status {status}: {}",
                truncate_body(&body)
            );
            return Ok(Vec::new());
        }

        let parsed: Value =
            serde_json::from_str(&body).context("Failed to parse cities response JSON")?;

        Ok(parse_cities(&parsed))
    }

    async fn resolve_city_path(&self, city: &str) -> Result<Option<String>> {
        let res = self
            .http
            .get(&self.completion_url)
            .query(&[("query", city), ("xd", "5"), ("mode", "ci")])
            .send()
            .await
            .with_context(|| format!("Failed to send city completion request for {city}"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read city completion response body")?;

        if !status.is_success() {
            tracing::warn!("City completion for {city} failed with status {status}");
            return Ok(None);
        }

        Ok(parse_city_path(&body))
    }
}

/// Strings of the `data` array; anything else counts as no data.
pub fn parse_cities(response: &Value) -> Vec<String> {
    if response.get("error").and_then(Value::as_bool) == Some(true) {
        return Vec::new();
    }

    response
        .get("data")
        .and_then(Value::as_array)
        .map(|cities| {
            cities
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

/// First `/weather/...` path in a completion response. Lines carrying `@`
/// point at non-city entries and are skipped.
pub fn parse_city_path(body: &str) -> Option<String> {
    body.lines()
        .filter(|line| line.starts_with("/weather/"))
        .filter(|line| !line.contains('@'))
        .find_map(|line| line.split('\t').next())
        .map(str::to_owned)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
