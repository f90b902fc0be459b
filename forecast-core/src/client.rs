//! Client side of `PUT /insertSearchTerm`.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::{
    model::{ForecastBundle, SearchRequest, SearchTerm},
    server::SEARCH_ROUTE,
};

/// The gateway call failed. Transport errors, non-2xx answers and
/// undecodable bodies all land here; the message is for logs only.
#[derive(Debug, Error)]
#[error("Forecast request failed: {0}")]
pub struct FetchError(String);

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        Self(e.to_string())
    }
}

/// Anything that can turn a search term into a forecast bundle.
#[async_trait]
pub trait ForecastSource: Send + Sync {
    async fn submit_search(&self, term: &SearchTerm) -> Result<ForecastBundle, FetchError>;
}

#[derive(Debug, Clone)]
pub struct GatewayClient {
    base_url: String,
    http: Client,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http })
    }
}

#[async_trait]
impl ForecastSource for GatewayClient {
    async fn submit_search(&self, term: &SearchTerm) -> Result<ForecastBundle, FetchError> {
        let url = format!("{}{}", self.base_url, SEARCH_ROUTE);
        tracing::debug!(%url, search_term = %term, "requesting forecast");

        let res = self
            .http
            .put(&url)
            .json(&SearchRequest { search_term: term.clone() })
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            return Err(FetchError::new(format!("gateway answered {status}: {body}")));
        }

        Ok(res.json::<ForecastBundle>().await?)
    }
}
