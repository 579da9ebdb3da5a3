//! Local weather store.
//!
//! Holds the most recent forecast as two tables (daily and hourly) and hands
//! out snapshot streams that re-emit whenever the tables are replaced. A
//! file-backed store keeps a JSON copy so the last forecast survives restarts.

use anyhow::{Context, Result};
use futures_util::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokio::sync::watch;

use crate::model::{HourlyWeatherRecord, WeatherRecord};
use crate::observable::watch_stream;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    daily: Vec<WeatherRecord>,
    hourly: Vec<HourlyWeatherRecord>,
}

#[derive(Debug)]
pub struct WeatherStore {
    daily: watch::Sender<Vec<WeatherRecord>>,
    hourly: watch::Sender<Vec<HourlyWeatherRecord>>,
    snapshot_path: Option<PathBuf>,
}

impl WeatherStore {
    pub fn in_memory() -> Self {
        Self::with_snapshot(Snapshot::default(), None)
    }

    /// Open a file-backed store, loading the previous snapshot if there is one.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read weather snapshot: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse weather snapshot: {}", path.display()))?
        } else {
            Snapshot::default()
        };

        tracing::debug!(
            path = %path.display(),
            days = snapshot.daily.len(),
            hours = snapshot.hourly.len(),
            "opened weather store"
        );
        Ok(Self::with_snapshot(snapshot, Some(path)))
    }

    fn with_snapshot(snapshot: Snapshot, snapshot_path: Option<PathBuf>) -> Self {
        let (daily, _) = watch::channel(snapshot.daily);
        let (hourly, _) = watch::channel(snapshot.hourly);
        Self {
            daily,
            hourly,
            snapshot_path,
        }
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Replace both tables wholesale. Daily ids are reassigned by position, so
    /// id 0 is always the first day of the latest forecast.
    ///
    /// A file-backed store writes the snapshot before publishing; if the write
    /// fails, observers keep seeing the previous tables.
    pub fn replace_forecast(
        &self,
        mut daily: Vec<WeatherRecord>,
        mut hourly: Vec<HourlyWeatherRecord>,
    ) -> Result<()> {
        for (id, record) in (0_i64..).zip(daily.iter_mut()) {
            record.id = id;
        }
        hourly.sort_by(|a, b| a.time.cmp(&b.time));

        if let Some(path) = &self.snapshot_path {
            let snapshot = Snapshot { daily, hourly };
            write_snapshot(path, &snapshot)?;
            daily = snapshot.daily;
            hourly = snapshot.hourly;
        }

        tracing::debug!(days = daily.len(), hours = hourly.len(), "weather tables replaced");
        self.daily.send_replace(daily);
        self.hourly.send_replace(hourly);
        Ok(())
    }

    pub fn daily(&self) -> Vec<WeatherRecord> {
        self.daily.borrow().clone()
    }

    pub fn hourly(&self) -> Vec<HourlyWeatherRecord> {
        self.hourly.borrow().clone()
    }

    /// Every daily snapshot, current one first.
    pub fn all_weather(&self) -> BoxStream<'static, Vec<WeatherRecord>> {
        watch_stream(self.daily.subscribe())
    }

    /// The record with `id`, re-evaluated on every replacement.
    pub fn weather_by_id(&self, id: i64) -> BoxStream<'static, Option<WeatherRecord>> {
        self.all_weather()
            .map(move |days| days.into_iter().find(|day| day.id == id))
            .boxed()
    }

    pub fn hourly_receiver(&self) -> watch::Receiver<Vec<HourlyWeatherRecord>> {
        self.hourly.subscribe()
    }
}

/// Records at or after `cutoff` (`YYYY-MM-DDTHH:mm`, compared lexically).
pub(crate) fn filter_from(
    hours: &[HourlyWeatherRecord],
    cutoff: &str,
) -> Vec<HourlyWeatherRecord> {
    hours
        .iter()
        .filter(|hour| hour.time.as_str() >= cutoff)
        .cloned()
        .collect()
}

fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string(snapshot).context("Failed to serialize weather snapshot")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .with_context(|| format!("Failed to write weather snapshot: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move weather snapshot: {}", path.display()))?;
    Ok(())
}
