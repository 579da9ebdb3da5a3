//! Date helpers shared by the synchronizer and the CLI.

use chrono::{DateTime, Local, NaiveDate, TimeZone};

use crate::error::SyncError;

/// Format used for hourly record keys and the hourly cutoff.
pub const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Format used for daily record keys.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Local wall-clock time truncated to the minute, e.g. `2023-11-28T14:05`.
pub fn current_timestamp() -> String {
    format_minute(&Local::now())
}

pub fn format_minute<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(MINUTE_FORMAT).to_string()
}

/// Long weekday name for a `YYYY-MM-DD` date.
pub fn try_convert_date_to_weekday(date_str: &str) -> Result<String, SyncError> {
    let date = NaiveDate::parse_from_str(date_str.trim(), DATE_FORMAT)
        .map_err(|_| SyncError::ParseFailed(date_str.to_string()))?;
    Ok(date.format("%A").to_string())
}

/// Like [`try_convert_date_to_weekday`], but an unparsable date yields `""`.
pub fn convert_date_to_weekday(date_str: &str) -> String {
    try_convert_date_to_weekday(date_str).unwrap_or_default()
}
