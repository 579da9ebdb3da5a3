use crate::{
    config::ApiConfig,
    model::{HourlyWeatherRecord, PlaceCandidate, WeatherRecord},
    provider::{nominatim::NominatimProvider, open_meteo::OpenMeteoProvider},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, sync::Arc, time::Duration};

pub mod nominatim;
pub mod open_meteo;

/// A downloaded forecast, ready to be written to the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    pub daily: Vec<WeatherRecord>,
    pub hourly: Vec<HourlyWeatherRecord>,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<Forecast>;
}

#[async_trait]
pub trait GeocodingProvider: Send + Sync + Debug {
    async fn search_places(&self, query: &str) -> Result<Vec<PlaceCandidate>>;
}

/// Construct the forecast and geocoding providers described by `config`.
pub fn providers_from_config(
    config: &ApiConfig,
) -> Result<(Arc<dyn WeatherProvider>, Arc<dyn GeocodingProvider>)> {
    let http = http_client(config)?;

    let weather: Arc<dyn WeatherProvider> =
        Arc::new(OpenMeteoProvider::new(config.forecast_base_url.clone(), http.clone()));
    let geocoding: Arc<dyn GeocodingProvider> = Arc::new(NominatimProvider::new(
        config.geocoding_base_url.clone(),
        config.search_limit,
        http,
    ));

    Ok((weather, geocoding))
}

/// Shared HTTP client; Nominatim rejects requests without a user agent.
pub fn http_client(config: &ApiConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .context("Failed to build HTTP client")
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
