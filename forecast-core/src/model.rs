use serde::{Deserialize, Serialize};

/// Weather state derived from a WMO weather interpretation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherState {
    #[default]
    ClearSky,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    Drizzle,
    FreezingDrizzle,
    Rain,
    FreezingRain,
    Snow,
    SnowGrains,
    RainShowers,
    SnowShowers,
    Thunderstorm,
    ThunderstormWithHail,
    Unknown,
}

impl WeatherState {
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_wmo_code(code: i32) -> Self {
        match code {
            0 => Self::ClearSky,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 | 48 => Self::Fog,
            51 | 53 | 55 => Self::Drizzle,
            56 | 57 => Self::FreezingDrizzle,
            61 | 63 | 65 => Self::Rain,
            66 | 67 => Self::FreezingRain,
            71 | 73 | 75 => Self::Snow,
            77 => Self::SnowGrains,
            80..=82 => Self::RainShowers,
            85 | 86 => Self::SnowShowers,
            95 => Self::Thunderstorm,
            96 | 99 => Self::ThunderstormWithHail,
            _ => Self::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ClearSky => "Clear sky",
            Self::MainlyClear => "Mainly clear",
            Self::PartlyCloudy => "Partly cloudy",
            Self::Overcast => "Overcast",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::FreezingDrizzle => "Freezing drizzle",
            Self::Rain => "Rain",
            Self::FreezingRain => "Freezing rain",
            Self::Snow => "Snow",
            Self::SnowGrains => "Snow grains",
            Self::RainShowers => "Rain showers",
            Self::SnowShowers => "Snow showers",
            Self::Thunderstorm => "Thunderstorm",
            Self::ThunderstormWithHail => "Thunderstorm with hail",
            Self::Unknown => "Unknown",
        }
    }
}

/// One day of weather, keyed by `id` for lookups and by `time` (`YYYY-MM-DD`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// Day offset inside the forecast the record came from (today = 0).
    pub id: i64,
    pub time: String,
    pub weather_state: WeatherState,
    pub temperature_max: f64,
    pub temperature_min: f64,
}

/// Weather for a single hour; `time` is `YYYY-MM-DDTHH:mm`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeatherRecord {
    pub time: String,
    pub weather_state: WeatherState,
    pub temperature: f64,
}

/// A geocoding search result. Coordinates stay in the geocoder's decimal
/// string form until a place is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub display_name: String,
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub place_type: Option<String>,
    #[serde(default)]
    pub importance: Option<f64>,
}

impl PlaceCandidate {
    pub fn new(
        display_name: impl Into<String>,
        lat: impl Into<String>,
        lon: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            lat: lat.into(),
            lon: lon.into(),
            name: None,
            place_type: None,
            importance: None,
        }
    }
}

/// Search bar state. Replaced as a whole value, never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopBarState {
    pub search_text: String,
    pub is_search_shown: bool,
}

impl TopBarState {
    pub fn with_search_text(&self, text: impl Into<String>) -> Self {
        Self {
            search_text: text.into(),
            ..self.clone()
        }
    }

    pub fn with_search_toggled(&self) -> Self {
        Self {
            is_search_shown: !self.is_search_shown,
            ..self.clone()
        }
    }
}

/// Row of the daily strip shown above the detailed view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeatherDisplay {
    pub time: String,
    pub weather_state: WeatherState,
    pub temperature_max: f64,
}

impl DailyWeatherDisplay {
    /// Single placeholder row shown before the first snapshot arrives.
    pub fn placeholder() -> Vec<Self> {
        vec![Self {
            time: "2023-11-28".to_string(),
            weather_state: WeatherState::ClearSky,
            temperature_max: 0.0,
        }]
    }
}

impl From<&WeatherRecord> for DailyWeatherDisplay {
    fn from(record: &WeatherRecord) -> Self {
        Self {
            time: record.time.clone(),
            weather_state: record.weather_state,
            temperature_max: record.temperature_max,
        }
    }
}

/// Temperature unit preference. Display only: stored values are Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn format(&self, celsius: f64) -> String {
        match self {
            TemperatureUnit::Celsius => format!("{:.1}°C", celsius),
            TemperatureUnit::Fahrenheit => format!("{:.1}°F", celsius * 9.0 / 5.0 + 32.0),
        }
    }
}

impl TryFrom<&str> for TemperatureUnit {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "c" | "celsius" => Ok(TemperatureUnit::Celsius),
            "f" | "fahrenheit" => Ok(TemperatureUnit::Fahrenheit),
            _ => Err(anyhow::anyhow!(
                "Unknown temperature unit '{value}'. Supported units: celsius, fahrenheit."
            )),
        }
    }
}

/// Result of a fetch-and-persist round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchOutcome {
    pub fetched: bool,
    pub persisted: bool,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        self.fetched && self.persisted
    }
}
