use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A device position, as reported by the location provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// The `"<lat>,<lon>"` string sent to the gateway.
    pub fn to_search_term(&self) -> SearchTerm {
        SearchTerm::new(format!("{},{}", self.latitude, self.longitude))
    }
}

/// Raw search term as received from a client. Never validated: whatever the
/// client sent is stored and forwarded upstream verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchTerm(String);

impl SearchTerm {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into the `lat` / `lon` query values. A term without a comma is
    /// treated as latitude only.
    pub fn lat_lon(&self) -> (&str, &str) {
        self.0.split_once(',').unwrap_or((self.0.as_str(), ""))
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SearchTerm {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Request body of `PUT /insertSearchTerm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search_term: SearchTerm,
}

/// All search terms received on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRecord {
    pub date: NaiveDate,
    pub search_terms: Vec<String>,
}

/// Acknowledgment of an append-with-upsert on a search record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAck {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<String>,
}

impl UpsertAck {
    /// The record did not exist and was created for `date`.
    pub fn inserted(date: NaiveDate) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_count: 1,
            upserted_id: Some(date.to_string()),
        }
    }

    /// An existing record was appended to.
    pub fn appended() -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count: 1,
            upserted_count: 0,
            upserted_id: None,
        }
    }
}

/// The three upstream payloads plus the persistence acknowledgment.
///
/// Payloads are passed through untouched. The current-conditions payload
/// travels as `dailyForecastData` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    #[serde(rename = "dailyForecastData")]
    pub current: Value,
    #[serde(rename = "sixteenDayForecastData")]
    pub sixteen_day: Value,
    #[serde(rename = "hourlyForecastData")]
    pub hourly: Value,
    pub result: UpsertAck,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// One entry of the current-conditions `data` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentObservation {
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub app_temp: Option<f64>,
    #[serde(default)]
    pub weather: WeatherSummary,
    #[serde(default)]
    pub rh: Option<f64>,
    #[serde(default)]
    pub wind_spd: Option<f64>,
    /// Compact hour-joined form, e.g. `2024-03-01:14`.
    #[serde(default)]
    pub datetime: Option<String>,
}

/// One day of the 16-day forecast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    #[serde(default)]
    pub valid_date: Option<String>,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub max_temp: Option<f64>,
    #[serde(default)]
    pub min_temp: Option<f64>,
    #[serde(default)]
    pub weather: WeatherSummary,
}

/// One hour of the hourly forecast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyEntry {
    #[serde(default)]
    pub timestamp_local: Option<String>,
    #[serde(default)]
    pub temp: Option<f64>,
    #[serde(default)]
    pub weather: WeatherSummary,
}
