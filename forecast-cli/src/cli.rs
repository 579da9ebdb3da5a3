use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use forecast_core::{
    AppContext, Config, EmptyQueryPolicy, HourlyWeatherRecord, Observable, PlaceCandidate,
    SearchPolicy, SyncError, TemperatureUnit, WeatherRecord, WeatherSynchronizer, calendar,
};
use inquire::Select;

/// How long to wait for search results beyond the debounce window.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Weather forecast client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Update and save configuration values.
    Configure {
        /// Display unit: "celsius" or "fahrenheit".
        #[arg(long)]
        unit: Option<String>,

        /// Quiet period before a search is sent, in milliseconds.
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// "cancel-previous" or "concurrent".
        #[arg(long)]
        search_policy: Option<String>,

        /// "keep" or "clear" the candidate list when the query becomes empty.
        #[arg(long)]
        empty_query: Option<String>,
    },

    /// Search for a place, download its forecast and store it.
    Search {
        /// Place name, e.g. "Stockholm".
        query: String,

        /// Pick the N-th result (1-based) instead of prompting.
        #[arg(long)]
        pick: Option<usize>,
    },

    /// Show the stored forecast.
    Show {
        /// Override the configured display unit for this run.
        #[arg(long)]
        unit: Option<String>,
    },

    /// Show one stored day by its key (0 = first day of the forecast).
    Day {
        key: i64,
    },

    /// Print the weekday of a YYYY-MM-DD date.
    Weekday {
        date: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure {
                unit,
                debounce_ms,
                search_policy,
                empty_query,
            } => configure(unit, debounce_ms, search_policy, empty_query),
            Command::Search { query, pick } => search(&query, pick).await,
            Command::Show { unit } => show(unit).await,
            Command::Day { key } => day(key).await,
            Command::Weekday { date } => {
                println!("{}", calendar::try_convert_date_to_weekday(&date)?);
                Ok(())
            }
        }
    }
}

fn configure(
    unit: Option<String>,
    debounce_ms: Option<u64>,
    search_policy: Option<String>,
    empty_query: Option<String>,
) -> Result<()> {
    let mut config = Config::load()?;

    if let Some(unit) = unit {
        config.temperature_unit = TemperatureUnit::try_from(unit.as_str())?;
    }
    if let Some(ms) = debounce_ms {
        config.search_debounce_ms = ms;
    }
    if let Some(policy) = search_policy {
        config.search_policy = SearchPolicy::try_from(policy.as_str())?;
    }
    if let Some(policy) = empty_query {
        config.empty_query = match policy.to_lowercase().as_str() {
            "keep" => EmptyQueryPolicy::Keep,
            "clear" => EmptyQueryPolicy::Clear,
            _ => bail!("Unknown empty-query policy '{policy}'. Supported: keep, clear."),
        };
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn open_session() -> Result<(std::sync::Arc<AppContext>, WeatherSynchronizer)> {
    let config = Config::load()?;
    let context = AppContext::init(&config)?;
    let sync = WeatherSynchronizer::from_context(&context);
    Ok((context, sync))
}

async fn search(query: &str, pick: Option<usize>) -> Result<()> {
    let (context, sync) = open_session()?;

    if !sync.get_connectivity() {
        bail!("No network connection; cannot search for '{query}'.");
    }

    let mut places = sync.places();
    let mut errors = sync.last_error();
    sync.on_search_text_changed(query);

    let wait = context.config().search_debounce() + SEARCH_TIMEOUT;
    let found = tokio::select! {
        found = places.wait_for(|list| !list.is_empty()) => found.unwrap_or_default(),
        error = errors.wait_for(Option::is_some) => {
            return Err(session_error(error.flatten()));
        }
        _ = tokio::time::sleep(wait) => bail!("No places found for '{query}'."),
    };

    let place = choose_place(&found, pick)?;

    let mut errors = sync.last_error();
    sync.update_weather_from_query(&place);
    let outcome = tokio::time::timeout(FETCH_TIMEOUT, errors.changed())
        .await
        .context("Timed out waiting for the forecast")?;
    if let Some(Some(error)) = outcome {
        return Err(session_error(Some(error)));
    }

    let expected = context.store().daily();
    let mut weather = sync.all_weather();
    let days = settled(&mut weather, |list| *list == expected).await;

    println!("Forecast for {}", place.display_name);
    print_week(&days, sync.temperature_unit().get());
    Ok(())
}

fn choose_place(found: &[PlaceCandidate], pick: Option<usize>) -> Result<PlaceCandidate> {
    if let Some(n) = pick {
        return n
            .checked_sub(1)
            .and_then(|i| found.get(i))
            .cloned()
            .ok_or_else(|| anyhow!("--pick {n} is out of range (1..={})", found.len()));
    }

    let labels: Vec<String> = found.iter().map(|p| p.display_name.clone()).collect();
    let choice = Select::new("Select a place:", labels)
        .raw_prompt()
        .context("No place selected")?;
    Ok(found[choice.index].clone())
}

async fn show(unit: Option<String>) -> Result<()> {
    let (context, sync) = open_session()?;

    if let Some(unit) = unit {
        sync.set_temperature_unit(TemperatureUnit::try_from(unit.as_str())?);
    }
    let unit = sync.temperature_unit().get();

    let expected = context.store().daily();
    let mut weather = sync.all_weather();
    let days = settled(&mut weather, |list| *list == expected).await;

    if days.is_empty() {
        println!("No forecast stored yet. Run `forecast search <place>` first.");
        return Ok(());
    }
    print_week(&days, unit);

    let upcoming = has_upcoming(&context.store().hourly(), &calendar::current_timestamp());
    let mut hourly = sync.all_weather_hourly();
    let hours = if upcoming {
        settled(&mut hourly, |hours| !hours.is_empty()).await
    } else {
        hourly.get()
    };
    if !hours.is_empty() {
        println!();
        print_hours(&hours, unit);
    }
    Ok(())
}

async fn day(key: i64) -> Result<()> {
    let (_context, sync) = open_session()?;

    let mut day = sync.day_of_week();
    sync.load_day_of_week(key);
    let _ = tokio::time::timeout(SETTLE_TIMEOUT, day.changed()).await;

    match day.get() {
        Some(record) => print_week(&[record], sync.temperature_unit().get()),
        None => println!("No weather stored for day {key}."),
    }
    Ok(())
}

/// Wait briefly for `observable` to satisfy `ready`, then return its value either way.
async fn settled<T>(observable: &mut Observable<T>, ready: impl FnMut(&T) -> bool) -> T
where
    T: Clone + Send + Sync + 'static,
{
    let _ = tokio::time::timeout(SETTLE_TIMEOUT, observable.wait_for(ready)).await;
    observable.get()
}

/// Whether the session's hourly view will have anything to show.
fn has_upcoming(hours: &[HourlyWeatherRecord], now: &str) -> bool {
    hours.iter().any(|hour| hour.time.as_str() >= now)
}

fn session_error(error: Option<SyncError>) -> anyhow::Error {
    match error {
        Some(error) => anyhow!("{} ({error})", error.user_message()),
        None => anyhow!("Weather session closed unexpectedly"),
    }
}

fn print_week(days: &[WeatherRecord], unit: TemperatureUnit) {
    for day in days {
        println!(
            "[{}] {:<9} {}  {:<22} {:>8} / {:>8}",
            day.id,
            calendar::convert_date_to_weekday(&day.time),
            day.time,
            day.weather_state.description(),
            unit.format(day.temperature_max),
            unit.format(day.temperature_min),
        );
    }
}

fn print_hours(hours: &[HourlyWeatherRecord], unit: TemperatureUnit) {
    for hour in hours.iter().take(24) {
        let label = NaiveDateTime::parse_from_str(&hour.time, calendar::MINUTE_FORMAT)
            .map(|t| t.format("%a %H:%M").to_string())
            .unwrap_or_else(|_| hour.time.clone());
        println!(
            "{label}  {:<22} {:>8}",
            hour.weather_state.description(),
            unit.format(hour.temperature),
        );
    }
}
