use async_trait::async_trait;
use serde_json::Value;
use std::fmt::{self, Debug};

use crate::{Config, model::SearchTerm, provider::weatherbit::WeatherbitProvider};

pub mod weatherbit;

/// The three upstream resources that make up a forecast bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForecastKind {
    Current,
    SixteenDay,
    Hourly,
}

impl ForecastKind {
    /// Order in which the gateway requests the resources.
    pub const PIPELINE: [ForecastKind; 3] =
        [ForecastKind::Current, ForecastKind::SixteenDay, ForecastKind::Hourly];

    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastKind::Current => "current",
            ForecastKind::SixteenDay => "16-day",
            ForecastKind::Hourly => "hourly",
        }
    }
}

impl fmt::Display for ForecastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    /// Fetch one resource for the coordinates in `term`, returning the
    /// provider's JSON body as-is.
    async fn fetch(&self, kind: ForecastKind, term: &SearchTerm) -> anyhow::Result<Value>;
}

/// Construct the upstream provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn ForecastProvider>> {
    let api_key = config.api_key()?;

    Ok(Box::new(WeatherbitProvider::with_base_url(
        config.upstream.base_url.clone(),
        api_key.to_owned(),
    )))
}
