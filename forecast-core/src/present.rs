//! Turning a forecast bundle into something to show.
//!
//! Nothing here fails loudly: a date that does not parse renders as a
//! placeholder, a missing number renders as `--`.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::{
    model::{CurrentObservation, DailyEntry, ForecastBundle, HourlyEntry},
    provider::ForecastKind,
    screen::{ScreenError, ScreenState},
};

/// Entries shown in the next-hours strip.
pub const HOURLY_STRIP_LEN: usize = 24;

pub const INVALID_DATE: &str = "Invalid Date";
pub const INVALID_TIME: &str = "Invalid Time";

pub const LOADING_TEXT: &str = "Getting Weather focust...";

const ICON_BASE_URL: &str = "https://www.weatherbit.io/static/img/icons";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("{0} payload has no `data` array")]
    MissingData(ForecastKind),

    #[error("{0} payload has an empty `data` array")]
    EmptyData(ForecastKind),

    #[error("{kind} payload has a malformed entry: {message}")]
    Malformed { kind: ForecastKind, message: String },
}

/// Presence-checked view of a [`ForecastBundle`].
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastView {
    pub current: CurrentObservation,
    pub daily: Vec<DailyEntry>,
    pub hourly: Vec<HourlyEntry>,
}

/// One cell of a horizontal strip.
#[derive(Debug, Clone, PartialEq)]
pub struct StripItem {
    pub label: String,
    pub temp: Option<f64>,
    pub icon: Option<String>,
}

impl ForecastView {
    pub fn from_bundle(bundle: &ForecastBundle) -> Result<Self, ViewError> {
        let mut current: Vec<CurrentObservation> =
            entries(ForecastKind::Current, &bundle.current)?;
        let daily = entries(ForecastKind::SixteenDay, &bundle.sixteen_day)?;
        let hourly = entries(ForecastKind::Hourly, &bundle.hourly)?;

        // Current conditions are a single record: the first entry.
        let current = current.swap_remove(0);

        Ok(Self { current, daily, hourly })
    }

    /// The first [`HOURLY_STRIP_LEN`] hours; the first one is "Now".
    pub fn hourly_strip(&self) -> Vec<StripItem> {
        self.hourly
            .iter()
            .take(HOURLY_STRIP_LEN)
            .enumerate()
            .map(|(i, h)| StripItem {
                label: if i == 0 {
                    "Now".to_string()
                } else {
                    format_time(h.timestamp_local.as_deref().unwrap_or_default())
                },
                temp: h.temp,
                icon: h.weather.icon.clone(),
            })
            .collect()
    }

    /// Every day the provider returned; the first one is "Today".
    pub fn daily_strip(&self) -> Vec<StripItem> {
        self.daily
            .iter()
            .enumerate()
            .map(|(i, d)| StripItem {
                label: if i == 0 {
                    "Today".to_string()
                } else {
                    format_date(d.valid_date.as_deref().unwrap_or_default())
                },
                temp: d.temp,
                icon: d.weather.icon.clone(),
            })
            .collect()
    }

    /// Today's high and low, from the first daily entry.
    pub fn high_low(&self) -> (Option<f64>, Option<f64>) {
        self.daily.first().map(|d| (d.max_temp, d.min_temp)).unwrap_or_default()
    }
}

fn entries<T>(kind: ForecastKind, payload: &Value) -> Result<Vec<T>, ViewError>
where
    T: for<'de> Deserialize<'de>,
{
    let data = payload
        .get("data")
        .filter(|d| d.is_array())
        .ok_or(ViewError::MissingData(kind))?;

    let items = Vec::<T>::deserialize(data)
        .map_err(|e| ViewError::Malformed { kind, message: e.to_string() })?;

    if items.is_empty() {
        return Err(ViewError::EmptyData(kind));
    }
    Ok(items)
}

pub fn icon_url(icon: &str) -> String {
    format!("{ICON_BASE_URL}/{icon}.png")
}

/// Formats the compact hour-joined form used for current conditions
/// (`2024-03-01:14`) as a short date, e.g. `Fri, Mar 1`.
pub fn format_hour_date(raw: &str) -> String {
    let iso = format!("{}:00:00", raw.replacen(':', "T", 1));
    match NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M:%S") {
        Ok(dt) => short_date(dt.date()),
        Err(_) => INVALID_DATE.to_string(),
    }
}

/// `2024-03-01` (or a full timestamp) as `Fri, Mar 1`.
pub fn format_date(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|dt| short_date(dt.date()))
        .unwrap_or_else(|| INVALID_DATE.to_string())
}

/// Hour and minute of a local timestamp, 24-hour clock: `14:00`.
pub fn format_time(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_else(|| INVALID_TIME.to_string())
}

fn short_date(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn num(value: Option<f64>) -> String {
    value.map_or_else(|| "--".to_string(), |v| v.to_string())
}

fn strip_line(items: &[StripItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} {}°", item.label, num(item.temp)))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Plain-text rendering of the screen.
pub fn render(state: &ScreenState) -> String {
    match state {
        ScreenState::Loading | ScreenState::AwaitingLocation => LOADING_TEXT.to_string(),
        ScreenState::Failed(err) => render_failure(err),
        ScreenState::Ready(view) => render_forecast(view),
    }
}

fn render_failure(err: &ScreenError) -> String {
    let mut out = err.user_message().to_string();
    if err.is_retryable() {
        out.push_str("\n[Retry]");
    }
    out
}

fn render_forecast(view: &ForecastView) -> String {
    let c = &view.current;
    let (high, low) = view.high_low();

    let temperature = match c.weather.icon.as_deref() {
        Some(icon) => format!("{}°  {}", num(c.temp), icon_url(icon)),
        None => format!("{}°", num(c.temp)),
    };

    let lines = [
        "Weather Focust".to_string(),
        "─".repeat(32),
        c.city_name.as_deref().unwrap_or_default().to_uppercase(),
        format_hour_date(c.datetime.as_deref().unwrap_or_default()),
        temperature,
        c.weather.description.as_deref().unwrap_or_default().to_string(),
        format!("Feels like: {}°", num(c.app_temp)),
        format!(
            "HI {}°  LO {}°  Humidity {}%  Wind Speed {}",
            num(high),
            num(low),
            num(c.rh),
            num(c.wind_spd)
        ),
        String::new(),
        "Hourly Weather Focust".to_string(),
        strip_line(&view.hourly_strip()),
        String::new(),
        "Weekly Weather Focust".to_string(),
        strip_line(&view.daily_strip()),
    ];

    lines.join("\n")
}
