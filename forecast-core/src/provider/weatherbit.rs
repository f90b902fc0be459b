use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::model::SearchTerm;

use super::{ForecastKind, ForecastProvider};

/// Length of the daily forecast requested from Weatherbit.
pub const DAILY_FORECAST_DAYS: u32 = 16;

#[derive(Debug, Clone)]
pub struct WeatherbitProvider {
    base_url: String,
    api_key: String,
    http: Client,
}

impl WeatherbitProvider {
    pub fn with_base_url(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            http: Client::new(),
        }
    }

    fn endpoint(&self, kind: ForecastKind) -> String {
        let path = match kind {
            ForecastKind::Current => "current",
            ForecastKind::SixteenDay => "forecast/daily",
            ForecastKind::Hourly => "forecast/hourly",
        };
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl ForecastProvider for WeatherbitProvider {
    async fn fetch(&self, kind: ForecastKind, term: &SearchTerm) -> Result<Value> {
        let (lat, lon) = term.lat_lon();
        let days = DAILY_FORECAST_DAYS.to_string();

        let mut query = vec![("lat", lat), ("lon", lon), ("key", self.api_key.as_str())];
        if kind == ForecastKind::SixteenDay {
            query.push(("days", days.as_str()));
        }

        let res = self
            .http
            .get(self.endpoint(kind))
            .query(&query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Weatherbit ({kind} forecast)"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read Weatherbit {kind} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "Weatherbit {} request failed with status {}: {}",
                kind,
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse Weatherbit {kind} JSON"))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn current_request_carries_coordinates_and_key() {
        let server = MockServer::start().await;
        let payload = json!({ "count": 1, "data": [{ "city_name": "Berlin", "temp": 12.5 }] });

        Mock::given(method("GET"))
            .and(path("/current"))
            .and(query_param("lat", "52.52"))
            .and(query_param("lon", "13.405"))
            .and(query_param("key", "SECRET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = WeatherbitProvider::with_base_url(server.uri(), "SECRET".into());
        let body = provider
            .fetch(ForecastKind::Current, &"52.52,13.405".into())
            .await
            .unwrap();

        assert_eq!(body, payload);
    }

    #[tokio::test]
    async fn sixteen_day_request_asks_for_sixteen_days() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast/daily"))
            .and(query_param("days", "16"))
            .and(query_param("key", "SECRET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            WeatherbitProvider::with_base_url(format!("{}/", server.uri()), "SECRET".into());
        provider.fetch(ForecastKind::SixteenDay, &"1,2".into()).await.unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast/hourly"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let provider = WeatherbitProvider::with_base_url(server.uri(), "BAD".into());
        let err = provider.fetch(ForecastKind::Hourly, &"1,2".into()).await.unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("403"));
        assert!(msg.contains("API key not valid"));
    }

    #[tokio::test]
    async fn non_json_body_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let provider = WeatherbitProvider::with_base_url(server.uri(), "KEY".into());
        let err = provider.fetch(ForecastKind::Current, &"1,2".into()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse Weatherbit current JSON"));
    }

    #[tokio::test]
    async fn transport_failure_is_an_error() {
        // Nothing listens on port 9 of localhost.
        let provider = WeatherbitProvider::with_base_url("http://127.0.0.1:9".into(), "KEY".into());
        let err = provider.fetch(ForecastKind::Current, &"1,2".into()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to send request"));
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
