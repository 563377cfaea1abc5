//! Current-conditions overlay from an OpenWeatherMap-compatible API.
//!
//! Weather is display-only. Nothing here feeds the humidity metrics.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather API returned HTTP {status} for '{location}'")]
    Status { status: u16, location: String },

    #[error("malformed weather payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// A dashboard location and the query string the weather API knows it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeatherLocation {
    pub label: String,
    pub query: String,
}

/// Current conditions for one dashboard location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    // ---
    pub location: String,
    pub temperature_c: f64,
    pub description: String,
    pub wind_speed_ms: f64,
    /// Rain over the last hour; the API omits the block when it is dry.
    pub rain_1h_mm: f64,
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    main: ApiMain,
    #[serde(default)]
    weather: Vec<ApiCondition>,
    #[serde(default)]
    wind: Option<ApiWind>,
    #[serde(default)]
    rain: Option<ApiRain>,
    #[serde(default)]
    dt: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ApiMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct ApiCondition {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ApiWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ApiRain {
    #[serde(rename = "1h", default)]
    one_hour: f64,
}

/// Turn a raw API body into a report for `location`.
pub fn parse_report(location: &str, body: &str) -> Result<WeatherReport, WeatherError> {
    // ---
    let raw: ApiResponse = serde_json::from_str(body)?;

    Ok(WeatherReport {
        location: location.to_string(),
        temperature_c: raw.main.temp,
        description: raw
            .weather
            .into_iter()
            .next()
            .map(|c| c.description)
            .unwrap_or_default(),
        wind_speed_ms: raw.wind.map_or(0.0, |w| w.speed),
        rain_1h_mm: raw.rain.map_or(0.0, |r| r.one_hour),
        observed_at: raw.dt.and_then(|ts| DateTime::from_timestamp(ts, 0)),
    })
}

#[derive(Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    // ---
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, WeatherError> {
        // ---
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Fetch current conditions for one location.
    pub async fn fetch(&self, location: &WeatherLocation) -> Result<WeatherReport, WeatherError> {
        // ---
        let url = format!("{}/weather", self.base_url);
        tracing::debug!("Fetching weather for '{}' from {}", location.label, url);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", location.query.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "es"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status {
                status: status.as_u16(),
                location: location.label.clone(),
            });
        }

        let body = response.text().await?;
        parse_report(&location.label, &body)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn parses_full_payload() {
        // ---
        let body = r#"{
            "weather": [{"id": 500, "main": "Rain", "description": "lluvia ligera"}],
            "main": {"temp": 17.4, "humidity": 82},
            "wind": {"speed": 3.6, "deg": 200},
            "rain": {"1h": 0.42},
            "dt": 1742990400,
            "name": "Bogotá"
        }"#;

        let report = parse_report("ubicacion 1", body).unwrap();
        assert_eq!(report.location, "ubicacion 1");
        assert_eq!(report.temperature_c, 17.4);
        assert_eq!(report.description, "lluvia ligera");
        assert_eq!(report.wind_speed_ms, 3.6);
        assert_eq!(report.rain_1h_mm, 0.42);
        assert_eq!(report.observed_at, DateTime::from_timestamp(1742990400, 0));
    }

    #[test]
    fn missing_optional_blocks_default_to_zero() {
        // ---
        let body = r#"{"main": {"temp": 25.0}}"#;

        let report = parse_report("ubicacion 2", body).unwrap();
        assert_eq!(report.description, "");
        assert_eq!(report.wind_speed_ms, 0.0);
        assert_eq!(report.rain_1h_mm, 0.0);
        assert_eq!(report.observed_at, None);
    }

    #[test]
    fn payload_without_temperature_is_rejected() {
        // ---
        let err = parse_report("ubicacion 1", r#"{"cod": "404", "message": "city not found"}"#)
            .unwrap_err();
        assert!(matches!(err, WeatherError::Payload(_)));
    }

    #[test]
    fn client_trims_trailing_slash() {
        // ---
        let client = WeatherClient::new("http://localhost:9/data/2.5/", "k").unwrap();
        assert_eq!(client.base_url, "http://localhost:9/data/2.5");
    }
}
