use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::model::{HourlyWeatherRecord, WeatherRecord, WeatherState};

use super::{Forecast, WeatherProvider, truncate_body};

const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min";
const HOURLY_FIELDS: &str = "temperature_2m,weather_code";

/// Forecast client for the Open-Meteo API.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    base_url: String,
    http: Client,
}

impl OpenMeteoProvider {
    pub fn new(base_url: String, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<String>,
    weather_code: Vec<Option<i32>>,
    temperature_2m_max: Vec<Option<f64>>,
    temperature_2m_min: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    weather_code: Vec<Option<i32>>,
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    daily: OmDaily,
    hourly: OmHourly,
}

impl OmResponse {
    /// Columns are zipped row by row; rows with a missing value are skipped.
    fn into_forecast(self) -> Forecast {
        let d = self.daily;
        let daily = d
            .time
            .into_iter()
            .zip(d.weather_code)
            .zip(d.temperature_2m_max.into_iter().zip(d.temperature_2m_min))
            .filter_map(|((time, code), (max, min))| {
                Some(WeatherRecord {
                    id: 0,
                    time,
                    weather_state: WeatherState::from_wmo_code(code?),
                    temperature_max: max?,
                    temperature_min: min?,
                })
            })
            .collect();

        let h = self.hourly;
        let hourly = h
            .time
            .into_iter()
            .zip(h.temperature_2m.into_iter().zip(h.weather_code))
            .filter_map(|(time, (temperature, code))| {
                Some(HourlyWeatherRecord {
                    time,
                    weather_state: WeatherState::from_wmo_code(code?),
                    temperature: temperature?,
                })
            })
            .collect();

        Forecast { daily, hourly }
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<Forecast> {
        let url = format!("{}/v1/forecast", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("latitude", lat), ("longitude", lon)])
            .query(&[
                ("daily", DAILY_FIELDS),
                ("hourly", HOURLY_FIELDS),
                ("timezone", "auto"),
            ])
            .send()
            .await
            .context("Failed to send request to Open-Meteo (forecast)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read Open-Meteo forecast response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        let parsed: OmResponse =
            serde_json::from_str(&body).context("Failed to parse Open-Meteo forecast JSON")?;

        let forecast = parsed.into_forecast();
        tracing::info!(
            lat,
            lon,
            days = forecast.daily.len(),
            hours = forecast.hourly.len(),
            "fetched forecast"
        );
        Ok(forecast)
    }
}
