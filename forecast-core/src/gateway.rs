//! The `submitSearch` flow: record the search, then fetch current
//! conditions, the 16-day forecast and the hourly forecast, in that order.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    clock::Clock,
    model::{ForecastBundle, SearchTerm},
    provider::{ForecastKind, ForecastProvider},
    store::{SearchStore, StoreError},
};

/// Why a search failed. Only used for logging: every variant is reported to
/// HTTP callers as the same opaque failure.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Failed to record search term")]
    Store(#[from] StoreError),

    #[error("Upstream {kind} forecast request failed")]
    Upstream {
        kind: ForecastKind,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Gateway {
    provider: Arc<dyn ForecastProvider>,
    store: Arc<dyn SearchStore>,
    clock: Arc<dyn Clock>,
}

impl Gateway {
    pub fn new(
        provider: Arc<dyn ForecastProvider>,
        store: Arc<dyn SearchStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { provider, store, clock }
    }

    pub fn store(&self) -> &Arc<dyn SearchStore> {
        &self.store
    }

    /// Record `term` under today's date and return the three upstream
    /// payloads. The first failing step aborts the whole search.
    pub async fn submit_search(&self, term: &SearchTerm) -> Result<ForecastBundle, GatewayError> {
        info!(search_term = %term, "search received");

        let date = self.clock.today();
        let ack = self.store.append_search(date, term).await?;
        debug!(%date, ?ack, "search term recorded");

        let [current, sixteen_day, hourly] = self.fetch_all(term).await?;

        Ok(ForecastBundle { current, sixteen_day, hourly, result: ack })
    }

    /// Runs [`ForecastKind::PIPELINE`] step by step; later kinds are never
    /// requested once one fails.
    async fn fetch_all(&self, term: &SearchTerm) -> Result<[Value; 3], GatewayError> {
        let mut payloads = [Value::Null, Value::Null, Value::Null];

        for (slot, kind) in payloads.iter_mut().zip(ForecastKind::PIPELINE) {
            *slot = self.fetch_one(kind, term).await?;
        }

        Ok(payloads)
    }

    async fn fetch_one(
        &self,
        kind: ForecastKind,
        term: &SearchTerm,
    ) -> Result<Value, GatewayError> {
        match self.provider.fetch(kind, term).await {
            Ok(payload) => {
                debug!(%kind, "upstream forecast received");
                Ok(payload)
            }
            Err(source) => {
                warn!(%kind, error = %format!("{source:#}"), "upstream forecast failed");
                Err(GatewayError::Upstream { kind, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::FixedClock, model::UpsertAck, store::MemoryStore};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Mutex;

    /// Provider that answers from a script and records every request.
    #[derive(Debug, Default)]
    struct ScriptedProvider {
        fail_on: Option<ForecastKind>,
        calls: Mutex<Vec<(ForecastKind, String)>>,
    }

    impl ScriptedProvider {
        fn failing_on(kind: ForecastKind) -> Self {
            Self { fail_on: Some(kind), ..Default::default() }
        }

        fn kinds(&self) -> Vec<ForecastKind> {
            self.calls.lock().unwrap().iter().map(|(k, _)| *k).collect()
        }
    }

    #[async_trait]
    impl ForecastProvider for ScriptedProvider {
        async fn fetch(&self, kind: ForecastKind, term: &SearchTerm) -> anyhow::Result<Value> {
            self.calls.lock().unwrap().push((kind, term.to_string()));
            if self.fail_on == Some(kind) {
                anyhow::bail!("{kind} unavailable");
            }
            Ok(json!({ "kind": kind.as_str(), "data": [{ "temp": 1.0 }] }))
        }
    }

    #[derive(Debug)]
    struct BrokenStore;

    #[async_trait]
    impl SearchStore for BrokenStore {
        async fn append_search(
            &self,
            _date: NaiveDate,
            _term: &SearchTerm,
        ) -> Result<UpsertAck, StoreError> {
            Err(StoreError::NoDataDir)
        }

        async fn record(
            &self,
            _date: NaiveDate,
        ) -> Result<Option<crate::model::SearchRecord>, StoreError> {
            Ok(None)
        }
    }

    fn march_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn gateway(provider: Arc<ScriptedProvider>, store: Arc<dyn SearchStore>) -> Gateway {
        Gateway::new(provider, store, Arc::new(FixedClock(march_first())))
    }

    #[tokio::test]
    async fn success_returns_payloads_in_named_slots() {
        let provider = Arc::new(ScriptedProvider::default());
        let gw = gateway(provider.clone(), Arc::new(MemoryStore::new()));

        let bundle = gw.submit_search(&"52.52,13.405".into()).await.unwrap();

        assert_eq!(bundle.current["kind"], "current");
        assert_eq!(bundle.sixteen_day["kind"], "16-day");
        assert_eq!(bundle.hourly["kind"], "hourly");
        assert_eq!(bundle.result, UpsertAck::inserted(march_first()));
        assert_eq!(provider.kinds(), ForecastKind::PIPELINE.to_vec());
    }

    #[tokio::test]
    async fn every_upstream_call_uses_the_same_term() {
        let provider = Arc::new(ScriptedProvider::default());
        let gw = gateway(provider.clone(), Arc::new(MemoryStore::new()));

        gw.submit_search(&"1.5,-2.5".into()).await.unwrap();

        let calls = provider.calls.lock().unwrap();
        assert!(calls.iter().all(|(_, term)| term == "1.5,-2.5"));
    }

    #[tokio::test]
    async fn first_failure_stops_the_pipeline() {
        for (failing, expected_calls) in [
            (ForecastKind::Current, vec![ForecastKind::Current]),
            (ForecastKind::SixteenDay, vec![ForecastKind::Current, ForecastKind::SixteenDay]),
            (ForecastKind::Hourly, ForecastKind::PIPELINE.to_vec()),
        ] {
            let provider = Arc::new(ScriptedProvider::failing_on(failing));
            let gw = gateway(provider.clone(), Arc::new(MemoryStore::new()));

            let err = gw.submit_search(&"1,2".into()).await.unwrap_err();

            assert!(matches!(err, GatewayError::Upstream { kind, .. } if kind == failing));
            assert_eq!(provider.kinds(), expected_calls);
        }
    }

    #[tokio::test]
    async fn search_is_recorded_even_when_upstream_fails() {
        let provider = Arc::new(ScriptedProvider::failing_on(ForecastKind::Current));
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(provider, store.clone());

        assert!(gw.submit_search(&"1,2".into()).await.is_err());

        let record = store.record(march_first()).await.unwrap().unwrap();
        assert_eq!(record.search_terms, vec!["1,2"]);
    }

    #[tokio::test]
    async fn store_failure_skips_upstream() {
        let provider = Arc::new(ScriptedProvider::default());
        let gw = gateway(provider.clone(), Arc::new(BrokenStore));

        let err = gw.submit_search(&"1,2".into()).await.unwrap_err();

        assert!(matches!(err, GatewayError::Store(_)));
        assert!(provider.kinds().is_empty());
    }

    #[tokio::test]
    async fn same_day_searches_are_appended() {
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(Arc::new(ScriptedProvider::default()), store.clone());

        let first = gw.submit_search(&"1,2".into()).await.unwrap();
        let second = gw.submit_search(&"3,4".into()).await.unwrap();

        assert_eq!(first.result.upserted_count, 1);
        assert_eq!(second.result, UpsertAck::appended());

        let record = gw.store().record(march_first()).await.unwrap().unwrap();
        assert_eq!(record.search_terms, vec!["1,2", "3,4"]);
    }

    #[tokio::test]
    async fn malformed_term_is_forwarded_verbatim() {
        let provider = Arc::new(ScriptedProvider::default());
        let store = Arc::new(MemoryStore::new());
        let gw = gateway(provider.clone(), store.clone());

        gw.submit_search(&"nowhere".into()).await.unwrap();

        assert_eq!(provider.calls.lock().unwrap()[0].1, "nowhere");
        let record = store.record(march_first()).await.unwrap().unwrap();
        assert_eq!(record.search_terms, vec!["nowhere"]);
    }
}
