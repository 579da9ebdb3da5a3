//! Process-wide bootstrap.
//!
//! The repository graph (store, providers, reachability) is built once per
//! process and shared by every synchronizer session.

use anyhow::{Context, Result};
use std::sync::{Arc, OnceLock};

use crate::{
    config::Config,
    connectivity::TcpProbe,
    provider::providers_from_config,
    repository::{WeatherRepository, WeatherService},
    store::WeatherStore,
};

static CONTEXT: OnceLock<Arc<AppContext>> = OnceLock::new();

#[derive(Debug)]
pub struct AppContext {
    config: Config,
    store: Arc<WeatherStore>,
    repository: Arc<dyn WeatherRepository>,
}

impl AppContext {
    /// Build the process-wide context on first call; later calls return the
    /// existing instance and ignore `config`.
    pub fn init(config: &Config) -> Result<Arc<Self>> {
        if let Some(existing) = CONTEXT.get() {
            return Ok(Arc::clone(existing));
        }

        let built = Arc::new(Self::build(config)?);
        // A concurrent initializer may have won the race; keep whichever landed.
        Ok(Arc::clone(CONTEXT.get_or_init(|| built)))
    }

    pub fn get() -> Option<Arc<Self>> {
        CONTEXT.get().cloned()
    }

    /// Build an unshared context. `init` uses this for the shared one.
    pub fn build(config: &Config) -> Result<Self> {
        let snapshot = config.snapshot_file_path()?;
        let store = Arc::new(
            WeatherStore::open(&snapshot).context("Failed to open the local weather store")?,
        );
        Self::with_store(config, store)
    }

    /// Build a context around an existing store.
    pub fn with_store(config: &Config, store: Arc<WeatherStore>) -> Result<Self> {
        let (weather, geocoding) = providers_from_config(&config.api)?;
        let reachability = Arc::new(TcpProbe::from_config(&config.reachability));

        let repository: Arc<dyn WeatherRepository> = Arc::new(WeatherService::new(
            Arc::clone(&store),
            weather,
            geocoding,
            reachability,
        ));

        tracing::info!(
            snapshot = ?store.snapshot_path(),
            "application context ready"
        );

        Ok(Self {
            config: config.clone(),
            store,
            repository,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<WeatherStore> {
        &self.store
    }

    pub fn repository(&self) -> Arc<dyn WeatherRepository> {
        Arc::clone(&self.repository)
    }
}
