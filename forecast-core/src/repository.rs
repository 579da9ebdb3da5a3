//! The data contract the synchronizer consumes, and its default implementation
//! over the local store, the HTTP providers and a reachability check.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use std::{fmt::Debug, sync::Arc};
use tokio::sync::watch;

use crate::{
    connectivity::Reachability,
    error::SyncError,
    model::{FetchOutcome, HourlyWeatherRecord, PlaceCandidate, WeatherRecord},
    provider::{GeocodingProvider, WeatherProvider},
    store::{WeatherStore, filter_from},
};

#[async_trait]
pub trait WeatherRepository: Send + Sync + Debug {
    /// Full daily list, re-emitted on every refresh.
    fn all_weather(&self) -> BoxStream<'static, Vec<WeatherRecord>>;

    /// Set the lower bound (`YYYY-MM-DDTHH:mm`) applied by
    /// [`all_weather_hourly_from_time`](Self::all_weather_hourly_from_time).
    fn get_all_weather_hourly_from_time(&self, timestamp: &str);

    /// Hourly records at or after the current cutoff, re-emitted when either
    /// the data or the cutoff changes.
    fn all_weather_hourly_from_time(&self) -> BoxStream<'static, Vec<HourlyWeatherRecord>>;

    /// Download the forecast for a coordinate and store it.
    async fn fetch_weather_data(&self, lat: f64, lon: f64) -> FetchOutcome;

    fn search_places(
        &self,
        query: &str,
    ) -> BoxStream<'static, Result<Vec<PlaceCandidate>, SyncError>>;

    /// The daily record stored under `key`, or `None` while there is none.
    fn get_weather(&self, key: i64) -> BoxStream<'static, Option<WeatherRecord>>;

    fn is_network_available(&self) -> bool;
}

/// Default repository: local store first, network on demand.
#[derive(Debug)]
pub struct WeatherService {
    store: Arc<WeatherStore>,
    weather: Arc<dyn WeatherProvider>,
    geocoding: Arc<dyn GeocodingProvider>,
    reachability: Arc<dyn Reachability>,
    hourly_cutoff: watch::Sender<String>,
}

impl WeatherService {
    pub fn new(
        store: Arc<WeatherStore>,
        weather: Arc<dyn WeatherProvider>,
        geocoding: Arc<dyn GeocodingProvider>,
        reachability: Arc<dyn Reachability>,
    ) -> Self {
        let (hourly_cutoff, _) = watch::channel(String::new());
        Self {
            store,
            weather,
            geocoding,
            reachability,
            hourly_cutoff,
        }
    }
}

#[async_trait]
impl WeatherRepository for WeatherService {
    fn all_weather(&self) -> BoxStream<'static, Vec<WeatherRecord>> {
        self.store.all_weather()
    }

    fn get_all_weather_hourly_from_time(&self, timestamp: &str) {
        tracing::debug!(timestamp, "hourly cutoff updated");
        self.hourly_cutoff.send_replace(timestamp.to_string());
    }

    fn all_weather_hourly_from_time(&self) -> BoxStream<'static, Vec<HourlyWeatherRecord>> {
        let records = self.store.hourly_receiver();
        let cutoff = self.hourly_cutoff.subscribe();

        stream::unfold((records, cutoff, true), |(mut records, mut cutoff, first)| async move {
            if !first {
                tokio::select! {
                    changed = records.changed() => changed.ok()?,
                    changed = cutoff.changed() => changed.ok()?,
                }
            }
            let from = cutoff.borrow_and_update().clone();
            let snapshot = filter_from(&records.borrow_and_update(), &from);
            Some((snapshot, (records, cutoff, false)))
        })
        .boxed()
    }

    async fn fetch_weather_data(&self, lat: f64, lon: f64) -> FetchOutcome {
        let forecast = match self.weather.fetch_forecast(lat, lon).await {
            Ok(forecast) => forecast,
            Err(e) => {
                tracing::warn!(lat, lon, "forecast fetch failed: {e:#}");
                return FetchOutcome {
                    fetched: false,
                    persisted: false,
                };
            }
        };

        let persisted = match self.store.replace_forecast(forecast.daily, forecast.hourly) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("storing forecast failed: {e:#}");
                false
            }
        };

        FetchOutcome {
            fetched: true,
            persisted,
        }
    }

    fn search_places(
        &self,
        query: &str,
    ) -> BoxStream<'static, Result<Vec<PlaceCandidate>, SyncError>> {
        let geocoding = Arc::clone(&self.geocoding);
        let query = query.to_string();

        stream::once(async move {
            geocoding
                .search_places(&query)
                .await
                .map_err(|e| SyncError::SearchFailed(format!("{e:#}")))
        })
        .boxed()
    }

    fn get_weather(&self, key: i64) -> BoxStream<'static, Option<WeatherRecord>> {
        self.store.weather_by_id(key)
    }

    fn is_network_available(&self) -> bool {
        self.reachability.is_network_available()
    }
}
