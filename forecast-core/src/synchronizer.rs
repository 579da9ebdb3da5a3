//! Session-scoped weather state.
//!
//! [`WeatherSynchronizer`] turns the repository's asynchronous sources
//! (stored forecast, hourly forecast, place search, day lookup) into a fixed
//! set of observable cells that a UI layer reads. Every task it starts hangs
//! off one session [`CancellationToken`], so closing or dropping the
//! synchronizer stops all of them.
//!
//! The loading flag only ever goes `true -> false`: it reports that the
//! stored-data pipeline is subscribed, not that data has arrived, and a later
//! fetch never sets it back to `true`.

use futures_util::StreamExt;
use parking_lot::Mutex;
use std::{future::Future, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

use crate::{
    calendar,
    config::{Config, EmptyQueryPolicy, SearchPolicy},
    context::AppContext,
    error::SyncError,
    model::{
        DailyWeatherDisplay, HourlyWeatherRecord, PlaceCandidate, TemperatureUnit, TopBarState,
        WeatherRecord,
    },
    observable::{Observable, StateCell},
    repository::WeatherRepository,
};

/// Per-session behaviour knobs, usually taken from [`Config`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub search_debounce: Duration,
    pub search_policy: SearchPolicy,
    pub empty_query: EmptyQueryPolicy,
    pub temperature_unit: TemperatureUnit,
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            search_debounce: config.search_debounce(),
            search_policy: config.search_policy,
            empty_query: config.empty_query,
            temperature_unit: config.temperature_unit,
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

#[derive(Debug)]
struct Cells {
    is_loading: StateCell<bool>,
    day_of_week: StateCell<Option<WeatherRecord>>,
    top_bar: StateCell<TopBarState>,
    all_weather: StateCell<Vec<WeatherRecord>>,
    all_weather_hourly: StateCell<Vec<HourlyWeatherRecord>>,
    places: StateCell<Vec<PlaceCandidate>>,
    daily_weather: StateCell<Vec<DailyWeatherDisplay>>,
    temperature_unit: StateCell<TemperatureUnit>,
    last_error: StateCell<Option<SyncError>>,
}

impl Cells {
    fn new(unit: TemperatureUnit) -> Self {
        Self {
            is_loading: StateCell::new(true),
            day_of_week: StateCell::new(None),
            top_bar: StateCell::default(),
            all_weather: StateCell::default(),
            all_weather_hourly: StateCell::default(),
            places: StateCell::default(),
            daily_weather: StateCell::new(DailyWeatherDisplay::placeholder()),
            temperature_unit: StateCell::new(unit),
            last_error: StateCell::new(None),
        }
    }

    fn fail(&self, error: SyncError) {
        tracing::warn!("{error}");
        self.last_error.set(Some(error));
    }
}

#[derive(Debug)]
pub struct WeatherSynchronizer {
    repository: Arc<dyn WeatherRepository>,
    options: SessionOptions,
    cells: Arc<Cells>,
    session: CancellationToken,
    search_task: Mutex<Option<CancellationToken>>,
    day_task: Mutex<Option<CancellationToken>>,
}

impl WeatherSynchronizer {
    /// Start a session and subscribe to the stored forecast.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(repository: Arc<dyn WeatherRepository>, options: SessionOptions) -> Self {
        let sync = Self {
            repository,
            cells: Arc::new(Cells::new(options.temperature_unit)),
            options,
            session: CancellationToken::new(),
            search_task: Mutex::new(None),
            day_task: Mutex::new(None),
        };
        sync.get_weather_from_db();
        sync
    }

    /// Start a session against the process-wide context.
    pub fn from_context(context: &AppContext) -> Self {
        Self::new(context.repository(), SessionOptions::from(context.config()))
    }

    fn spawn_scoped<F>(&self, token: CancellationToken, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = work => {}
            }
        });
    }

    fn get_weather_from_db(&self) {
        let cells = Arc::clone(&self.cells);
        let mut days = self.repository.all_weather();
        self.spawn_scoped(self.session.clone(), async move {
            while let Some(list) = days.next().await {
                tracing::debug!(days = list.len(), "weather list updated");
                if !list.is_empty() {
                    cells
                        .daily_weather
                        .set(list.iter().map(DailyWeatherDisplay::from).collect());
                }
                cells.all_weather.set(list);
            }
        });

        let cells = Arc::clone(&self.cells);
        let repository = Arc::clone(&self.repository);
        self.spawn_scoped(self.session.clone(), async move {
            let now = calendar::current_timestamp();
            tracing::debug!(from = %now, "subscribing to hourly weather");
            repository.get_all_weather_hourly_from_time(&now);

            let mut hours = repository.all_weather_hourly_from_time();
            while let Some(list) = hours.next().await {
                cells.all_weather_hourly.set(list);
            }
        });

        // Subscriptions are scheduled; data may still be on its way.
        self.cells.is_loading.set(false);
    }

    pub fn get_connectivity(&self) -> bool {
        self.repository.is_network_available()
    }

    /// Fetch and store the forecast for `place`, then clear the search text.
    ///
    /// Does nothing but record [`SyncError::NoConnectivity`] when offline.
    pub fn update_weather_from_query(&self, place: &PlaceCandidate) {
        if !self.get_connectivity() {
            self.cells.fail(SyncError::NoConnectivity);
            return;
        }

        let (lat, lon) = match parse_coordinates(place) {
            Ok(coordinates) => coordinates,
            Err(e) => {
                self.cells.fail(e);
                return;
            }
        };

        tracing::info!(place = %place.display_name, lat, lon, "fetching weather for place");
        let cells = Arc::clone(&self.cells);
        let repository = Arc::clone(&self.repository);
        self.spawn_scoped(self.session.clone(), async move {
            let outcome = repository.fetch_weather_data(lat, lon).await;
            if outcome.is_success() {
                cells.is_loading.set(false);
                cells.last_error.set(None);
            } else if !outcome.fetched {
                cells.fail(SyncError::FetchFailed);
            } else {
                cells.fail(SyncError::PersistFailed);
            }
        });

        self.update_text_field("");
    }

    pub fn update_text_field(&self, text: &str) {
        self.cells.top_bar.update(|bar| bar.with_search_text(text));
    }

    /// Record a keystroke and schedule a debounced place search for it.
    pub fn on_search_text_changed(&self, query: &str) {
        self.update_text_field(query);

        if !self.get_connectivity() {
            if self.options.search_policy == SearchPolicy::CancelPrevious {
                self.cancel_pending_search();
            }
            self.cells.places.set(Vec::new());
            self.cells.fail(SyncError::NoConnectivity);
            return;
        }

        let token = self.next_search_token();
        let cells = Arc::clone(&self.cells);
        let repository = Arc::clone(&self.repository);
        let debounce = self.options.search_debounce;
        let empty_query = self.options.empty_query;
        let query = query.to_string();

        self.spawn_scoped(token, async move {
            tokio::time::sleep(debounce).await;

            if query.is_empty() {
                if empty_query == EmptyQueryPolicy::Clear {
                    cells.places.set(Vec::new());
                }
                return;
            }

            tracing::info!(%query, "searching places");
            let mut results = repository.search_places(&query);
            while let Some(result) = results.next().await {
                match result {
                    Ok(places) => {
                        tracing::debug!(%query, results = places.len(), "place candidates updated");
                        cells.places.set(places);
                        cells.last_error.set(None);
                    }
                    Err(e) => cells.fail(e),
                }
            }
        });
    }

    fn next_search_token(&self) -> CancellationToken {
        let token = self.session.child_token();
        if self.options.search_policy == SearchPolicy::CancelPrevious {
            if let Some(previous) = self.search_task.lock().replace(token.clone()) {
                previous.cancel();
            }
        }
        token
    }

    fn cancel_pending_search(&self) {
        if let Some(previous) = self.search_task.lock().take() {
            previous.cancel();
        }
    }

    /// Look up the stored day under `key`. A newer call replaces the previous
    /// subscription.
    pub fn load_day_of_week(&self, key: i64) {
        let token = self.session.child_token();
        if let Some(previous) = self.day_task.lock().replace(token.clone()) {
            previous.cancel();
        }

        let cells = Arc::clone(&self.cells);
        let mut day = self.repository.get_weather(key);
        self.spawn_scoped(token, async move {
            while let Some(record) = day.next().await {
                tracing::debug!(key, found = record.is_some(), "day lookup updated");
                cells.day_of_week.set(record);
            }
        });
    }

    pub fn show_search(&self) {
        self.cells.top_bar.update(TopBarState::with_search_toggled);
        tracing::debug!(shown = self.cells.top_bar.get().is_search_shown, "search bar toggled");
    }

    pub fn set_temperature_unit(&self, unit: TemperatureUnit) {
        self.cells.temperature_unit.set(unit);
    }

    /// Long weekday name for `YYYY-MM-DD`, or `""` when the date does not parse.
    pub fn convert_date_to_weekday(&self, date_str: &str) -> String {
        calendar::convert_date_to_weekday(date_str)
    }

    /// Cancel every task this session started. Cells keep their last values.
    pub fn close(&self) {
        if !self.session.is_cancelled() {
            tracing::debug!("closing weather session");
            self.session.cancel();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_cancelled()
    }

    pub fn is_loading(&self) -> Observable<bool> {
        self.cells.is_loading.observe()
    }

    pub fn day_of_week(&self) -> Observable<Option<WeatherRecord>> {
        self.cells.day_of_week.observe()
    }

    pub fn top_bar(&self) -> Observable<TopBarState> {
        self.cells.top_bar.observe()
    }

    pub fn search_text(&self) -> String {
        self.cells.top_bar.get().search_text
    }

    pub fn all_weather(&self) -> Observable<Vec<WeatherRecord>> {
        self.cells.all_weather.observe()
    }

    pub fn all_weather_hourly(&self) -> Observable<Vec<HourlyWeatherRecord>> {
        self.cells.all_weather_hourly.observe()
    }

    pub fn places(&self) -> Observable<Vec<PlaceCandidate>> {
        self.cells.places.observe()
    }

    pub fn daily_weather(&self) -> Observable<Vec<DailyWeatherDisplay>> {
        self.cells.daily_weather.observe()
    }

    pub fn temperature_unit(&self) -> Observable<TemperatureUnit> {
        self.cells.temperature_unit.observe()
    }

    pub fn last_error(&self) -> Observable<Option<SyncError>> {
        self.cells.last_error.observe()
    }
}

impl Drop for WeatherSynchronizer {
    fn drop(&mut self) {
        self.session.cancel();
    }
}

fn parse_coordinates(place: &PlaceCandidate) -> Result<(f64, f64), SyncError> {
    let parse = |raw: &str| {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| SyncError::InvalidCoordinate(raw.to_string()))
    };
    Ok((parse(&place.lat)?, parse(&place.lon)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FetchOutcome, WeatherState};
    use async_trait::async_trait;
    use futures_util::stream::{self, BoxStream};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::watch;
    use tokio::time::{sleep, timeout};

    #[derive(Debug)]
    struct FakeRepository {
        online: AtomicBool,
        days: watch::Sender<Vec<WeatherRecord>>,
        hours: watch::Sender<Vec<HourlyWeatherRecord>>,
        cutoffs: Mutex<Vec<String>>,
        searches: Mutex<Vec<String>>,
        search_delays: Mutex<HashMap<String, Duration>>,
        day_delays: Mutex<HashMap<i64, Duration>>,
        fetch_outcome: Mutex<FetchOutcome>,
        fetches: Mutex<Vec<(f64, f64)>>,
    }

    impl FakeRepository {
        fn new(online: bool) -> Arc<Self> {
            Arc::new(Self {
                online: AtomicBool::new(online),
                days: watch::channel(Vec::new()).0,
                hours: watch::channel(Vec::new()).0,
                cutoffs: Mutex::new(Vec::new()),
                searches: Mutex::new(Vec::new()),
                search_delays: Mutex::new(HashMap::new()),
                day_delays: Mutex::new(HashMap::new()),
                fetch_outcome: Mutex::new(FetchOutcome {
                    fetched: true,
                    persisted: true,
                }),
                fetches: Mutex::new(Vec::new()),
            })
        }

        fn set_online(&self, online: bool) {
            self.online.store(online, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl WeatherRepository for FakeRepository {
        fn all_weather(&self) -> BoxStream<'static, Vec<WeatherRecord>> {
            crate::observable::watch_stream(self.days.subscribe())
        }

        fn get_all_weather_hourly_from_time(&self, timestamp: &str) {
            self.cutoffs.lock().push(timestamp.to_string());
        }

        fn all_weather_hourly_from_time(&self) -> BoxStream<'static, Vec<HourlyWeatherRecord>> {
            crate::observable::watch_stream(self.hours.subscribe())
        }

        async fn fetch_weather_data(&self, lat: f64, lon: f64) -> FetchOutcome {
            self.fetches.lock().push((lat, lon));
            *self.fetch_outcome.lock()
        }

        fn search_places(
            &self,
            query: &str,
        ) -> BoxStream<'static, Result<Vec<PlaceCandidate>, SyncError>> {
            self.searches.lock().push(query.to_string());
            let delay = self.search_delays.lock().get(query).copied().unwrap_or_default();
            let places = vec![PlaceCandidate::new(query, "59.33", "18.07")];
            stream::once(async move {
                sleep(delay).await;
                Ok(places)
            })
            .boxed()
        }

        fn get_weather(&self, key: i64) -> BoxStream<'static, Option<WeatherRecord>> {
            let delay = self.day_delays.lock().get(&key).copied().unwrap_or_default();
            let days = self.days.subscribe();
            stream::once(async move {
                sleep(delay).await;
                let found = days.borrow().iter().find(|day| day.id == key).cloned();
                found
            })
            .boxed()
        }

        fn is_network_available(&self) -> bool {
            self.online.load(Ordering::SeqCst)
        }
    }

    fn record(id: i64, time: &str) -> WeatherRecord {
        WeatherRecord {
            id,
            time: time.to_string(),
            weather_state: WeatherState::PartlyCloudy,
            temperature_max: 6.0 + id as f64,
            temperature_min: 1.0,
        }
    }

    fn session(repo: &Arc<FakeRepository>, options: SessionOptions) -> WeatherSynchronizer {
        WeatherSynchronizer::new(Arc::clone(repo) as Arc<dyn WeatherRepository>, options)
    }

    async fn settle<T>(fut: impl Future<Output = Option<T>>) -> T {
        timeout(Duration::from_secs(30), fut)
            .await
            .expect("state did not settle")
            .expect("cell writer dropped")
    }

    #[tokio::test(start_paused = true)]
    async fn loading_is_false_right_after_construction() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());

        assert!(!sync.is_loading().get());
        assert!(sync.all_weather().get().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn subscriptions_replace_lists_wholesale() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());
        let mut all = sync.all_weather();
        let mut hourly = sync.all_weather_hourly();

        repo.days.send_replace(vec![record(0, "2023-11-28"), record(1, "2023-11-29")]);
        settle(all.wait_for(|list| list.len() == 2)).await;

        repo.days.send_replace(vec![record(0, "2023-11-30")]);
        let list = settle(all.wait_for(|list| list.len() == 1)).await;
        assert_eq!(list[0].time, "2023-11-30");

        repo.hours.send_replace(vec![HourlyWeatherRecord {
            time: "2023-11-30T12:00".into(),
            weather_state: WeatherState::Fog,
            temperature: 2.0,
        }]);
        settle(hourly.wait_for(|list| list.len() == 1)).await;

        let cutoffs = repo.cutoffs.lock().clone();
        assert_eq!(cutoffs.len(), 1);
        assert_eq!(cutoffs[0].len(), 16);
        assert_eq!(&cutoffs[0][10..11], "T");
    }

    #[tokio::test(start_paused = true)]
    async fn daily_display_keeps_placeholder_until_data() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());
        let mut daily = sync.daily_weather();

        assert_eq!(daily.get(), DailyWeatherDisplay::placeholder());

        repo.days.send_replace(vec![record(0, "2023-12-01"), record(1, "2023-12-02")]);
        let rows = settle(daily.wait_for(|rows| rows.len() == 2)).await;
        assert_eq!(rows[1].time, "2023-12-02");
        assert_eq!(rows[1].temperature_max, 7.0);
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_search_publishes_results() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());
        let mut places = sync.places();

        sync.on_search_text_changed("Stockholm");
        assert_eq!(sync.search_text(), "Stockholm");

        sleep(Duration::from_millis(999)).await;
        assert!(repo.searches.lock().is_empty());
        assert!(places.get().is_empty());

        let found = settle(places.wait_for(|list| !list.is_empty())).await;
        assert_eq!(found, vec![PlaceCandidate::new("Stockholm", "59.33", "18.07")]);
        assert_eq!(*repo.searches.lock(), vec!["Stockholm".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn offline_keystroke_clears_places_synchronously() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());
        let mut places = sync.places();

        sync.on_search_text_changed("Oslo");
        settle(places.wait_for(|list| !list.is_empty())).await;

        repo.set_online(false);
        sync.on_search_text_changed("Osl");

        assert!(places.get().is_empty());
        assert_eq!(sync.search_text(), "Osl");
        assert_eq!(sync.last_error().get(), Some(SyncError::NoConnectivity));
        assert_eq!(repo.searches.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_search_clears_stale_error() {
        let repo = FakeRepository::new(false);
        let sync = session(&repo, SessionOptions::default());
        let mut errors = sync.last_error();

        sync.on_search_text_changed("Bergen");
        assert_eq!(errors.get(), Some(SyncError::NoConnectivity));

        repo.set_online(true);
        sync.on_search_text_changed("Bergen");
        let cleared = settle(errors.wait_for(Option::is_none)).await;
        assert_eq!(cleared, None);
        assert_eq!(sync.places().get().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_only_searches_latest_query() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());
        let mut places = sync.places();

        sync.on_search_text_changed("G");
        sleep(Duration::from_millis(300)).await;
        sync.on_search_text_changed("Go");
        sleep(Duration::from_millis(300)).await;
        sync.on_search_text_changed("Got");

        let found = settle(places.wait_for(|list| !list.is_empty())).await;
        sleep(Duration::from_secs(5)).await;

        assert_eq!(found[0].display_name, "Got");
        assert_eq!(*repo.searches.lock(), vec!["Got".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_policy_lets_slowest_search_win() {
        let repo = FakeRepository::new(true);
        repo.search_delays
            .lock()
            .insert("Ma".to_string(), Duration::from_secs(3));
        let options = SessionOptions {
            search_policy: SearchPolicy::Concurrent,
            ..SessionOptions::default()
        };
        let sync = session(&repo, options);
        let places = sync.places();

        sync.on_search_text_changed("Ma");
        sync.on_search_text_changed("Malmö");
        sleep(Duration::from_secs(10)).await;

        assert_eq!(repo.searches.lock().len(), 2);
        assert_eq!(places.get()[0].display_name, "Ma");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_query_keeps_previous_candidates_by_default() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());
        let mut places = sync.places();

        sync.on_search_text_changed("Bergen");
        settle(places.wait_for(|list| !list.is_empty())).await;

        sync.on_search_text_changed("");
        sleep(Duration::from_secs(3)).await;

        assert_eq!(places.get().len(), 1);
        assert_eq!(repo.searches.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_query_can_clear_candidates() {
        let repo = FakeRepository::new(true);
        let options = SessionOptions {
            empty_query: EmptyQueryPolicy::Clear,
            ..SessionOptions::default()
        };
        let sync = session(&repo, options);
        let mut places = sync.places();

        sync.on_search_text_changed("Bergen");
        settle(places.wait_for(|list| !list.is_empty())).await;

        sync.on_search_text_changed("");
        settle(places.wait_for(|list| list.is_empty())).await;
    }

    #[tokio::test(start_paused = true)]
    async fn update_from_query_offline_is_a_no_op() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());
        let mut places = sync.places();

        sync.on_search_text_changed("Turku");
        settle(places.wait_for(|list| !list.is_empty())).await;

        repo.set_online(false);
        let place = places.get()[0].clone();
        sync.update_weather_from_query(&place);
        sleep(Duration::from_secs(1)).await;

        assert!(!sync.is_loading().get());
        assert_eq!(places.get(), vec![place]);
        assert_eq!(sync.search_text(), "Turku");
        assert!(repo.fetches.lock().is_empty());
        assert_eq!(sync.last_error().get(), Some(SyncError::NoConnectivity));
    }

    #[tokio::test(start_paused = true)]
    async fn successful_fetch_clears_text_and_error() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());

        sync.update_text_field("Tromsø");
        sync.update_weather_from_query(&PlaceCandidate::new("Tromsø", "69.65", "18.96"));

        assert_eq!(sync.search_text(), "");
        sleep(Duration::from_millis(10)).await;

        assert_eq!(*repo.fetches.lock(), vec![(69.65, 18.96)]);
        assert!(!sync.is_loading().get());
        assert_eq!(sync.last_error().get(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_still_clears_text() {
        let repo = FakeRepository::new(true);
        *repo.fetch_outcome.lock() = FetchOutcome {
            fetched: false,
            persisted: false,
        };
        let sync = session(&repo, SessionOptions::default());
        let mut errors = sync.last_error();

        sync.update_text_field("Kiruna");
        sync.update_weather_from_query(&PlaceCandidate::new("Kiruna", "67.85", "20.22"));

        assert_eq!(sync.search_text(), "");
        let error = settle(errors.wait_for(|e| e.is_some())).await;
        assert_eq!(error, Some(SyncError::FetchFailed));
        assert!(!sync.is_loading().get());
    }

    #[tokio::test(start_paused = true)]
    async fn persist_failure_is_reported() {
        let repo = FakeRepository::new(true);
        *repo.fetch_outcome.lock() = FetchOutcome {
            fetched: true,
            persisted: false,
        };
        let sync = session(&repo, SessionOptions::default());
        let mut errors = sync.last_error();

        sync.update_weather_from_query(&PlaceCandidate::new("Visby", "57.64", "18.29"));

        let error = settle(errors.wait_for(|e| e.is_some())).await;
        assert_eq!(error, Some(SyncError::PersistFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_coordinates_dispatch_nothing() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());

        sync.update_text_field("Atlantis");
        sync.update_weather_from_query(&PlaceCandidate::new("Atlantis", "north", "18.0"));
        sleep(Duration::from_secs(1)).await;

        assert!(repo.fetches.lock().is_empty());
        assert_eq!(sync.search_text(), "Atlantis");
        assert_eq!(
            sync.last_error().get(),
            Some(SyncError::InvalidCoordinate("north".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn latest_day_lookup_wins() {
        let repo = FakeRepository::new(true);
        repo.days.send_replace(vec![
            record(0, "2023-11-28"),
            record(1, "2023-11-29"),
            record(2, "2023-11-30"),
        ]);
        repo.day_delays.lock().insert(1, Duration::from_secs(3));
        repo.day_delays.lock().insert(2, Duration::from_secs(1));
        let sync = session(&repo, SessionOptions::default());
        let day = sync.day_of_week();

        assert_eq!(day.get(), None);
        sync.load_day_of_week(1);
        sync.load_day_of_week(2);
        sleep(Duration::from_secs(5)).await;

        assert_eq!(day.get().map(|d| d.time), Some("2023-11-30".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_day_resolves_to_none() {
        let repo = FakeRepository::new(true);
        repo.days.send_replace(vec![record(0, "2023-11-28")]);
        let sync = session(&repo, SessionOptions::default());
        let mut day = sync.day_of_week();

        sync.load_day_of_week(0);
        settle(day.wait_for(|d| d.is_some())).await;

        sync.load_day_of_week(6);
        settle(day.wait_for(|d| d.is_none())).await;
    }

    #[tokio::test(start_paused = true)]
    async fn top_bar_and_unit_are_copy_on_write() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());

        sync.update_text_field("Umeå");
        sync.show_search();
        assert_eq!(
            sync.top_bar().get(),
            TopBarState {
                search_text: "Umeå".into(),
                is_search_shown: true
            }
        );
        sync.show_search();
        assert!(!sync.top_bar().get().is_search_shown);

        assert_eq!(sync.temperature_unit().get(), TemperatureUnit::Celsius);
        sync.set_temperature_unit(TemperatureUnit::Fahrenheit);
        assert_eq!(sync.temperature_unit().get(), TemperatureUnit::Fahrenheit);
    }

    #[tokio::test(start_paused = true)]
    async fn weekday_conversion() {
        let repo = FakeRepository::new(false);
        let sync = session(&repo, SessionOptions::default());

        assert_eq!(sync.convert_date_to_weekday("2023-11-28"), "Tuesday");
        assert_eq!(sync.convert_date_to_weekday("not-a-date"), "");
    }

    #[tokio::test(start_paused = true)]
    async fn connectivity_is_queried_every_time() {
        let repo = FakeRepository::new(false);
        let sync = session(&repo, SessionOptions::default());

        assert!(!sync.get_connectivity());
        repo.set_online(true);
        assert!(sync.get_connectivity());
    }

    #[tokio::test(start_paused = true)]
    async fn close_stops_subscriptions() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());
        let mut all = sync.all_weather();

        repo.days.send_replace(vec![record(0, "2023-11-28")]);
        settle(all.wait_for(|list| list.len() == 1)).await;

        sync.close();
        assert!(sync.is_closed());
        repo.days.send_replace(vec![record(0, "2023-11-28"), record(1, "2023-11-29")]);
        sleep(Duration::from_secs(1)).await;

        assert_eq!(all.get().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pending_search() {
        let repo = FakeRepository::new(true);
        let sync = session(&repo, SessionOptions::default());

        sync.on_search_text_changed("Narvik");
        sync.close();
        sleep(Duration::from_secs(3)).await;

        assert!(repo.searches.lock().is_empty());
        assert!(sync.places().get().is_empty());
    }
}
