//! Core library for the `forecast` weather client.
//!
//! This crate defines:
//! - A session-scoped synchronizer that turns stored and remote weather data
//!   into observable state for a UI layer
//! - The repository contract it consumes, plus a local store, HTTP providers
//!   and a reachability probe that implement it
//! - Configuration and the process-wide bootstrap
//!
//! It is used by `forecast-cli`, but any front end that can poll or await
//! [`Observable`] values can drive it.

pub mod calendar;
pub mod config;
pub mod connectivity;
pub mod context;
pub mod error;
pub mod model;
pub mod observable;
pub mod provider;
pub mod repository;
pub mod store;
pub mod synchronizer;

pub use config::{Config, EmptyQueryPolicy, SearchPolicy};
pub use context::AppContext;
pub use error::SyncError;
pub use model::{
    DailyWeatherDisplay, FetchOutcome, HourlyWeatherRecord, PlaceCandidate, TemperatureUnit,
    TopBarState, WeatherRecord, WeatherState,
};
pub use observable::{Observable, StateCell};
pub use repository::{WeatherRepository, WeatherService};
pub use store::WeatherStore;
pub use synchronizer::{SessionOptions, WeatherSynchronizer};
