use thiserror::Error;

/// Failure reasons surfaced to observers through the synchronizer's
/// `last_error` cell.
///
/// The type is `Clone + PartialEq` so it can live inside a state cell and be
/// compared by observers; underlying causes are flattened into messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("No network connection available")]
    NoConnectivity,

    #[error("Failed to fetch weather data")]
    FetchFailed,

    #[error("Weather data was fetched but could not be stored")]
    PersistFailed,

    #[error("Could not parse date '{0}'")]
    ParseFailed(String),

    #[error("Invalid coordinate '{0}'")]
    InvalidCoordinate(String),

    #[error("Place search failed: {0}")]
    SearchFailed(String),
}

impl SyncError {
    /// Short message suitable for a status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            SyncError::NoConnectivity => "You appear to be offline.",
            SyncError::FetchFailed => "Could not download the forecast. Please try again.",
            SyncError::PersistFailed => "The forecast could not be saved.",
            SyncError::ParseFailed(_) => "That date could not be read.",
            SyncError::InvalidCoordinate(_) => "The selected place has no valid coordinates.",
            SyncError::SearchFailed(_) => "Place search failed. Please try again.",
        }
    }
}
