//! Persistence of search terms, one document per calendar day.

use async_trait::async_trait;
use chrono::NaiveDate;
use directories::ProjectDirs;
use std::{
    collections::BTreeMap,
    fmt::Debug,
    io,
    path::PathBuf,
};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::model::{SearchRecord, SearchTerm, UpsertAck};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on search store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize search records: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Search store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not determine platform data directory")]
    NoDataDir,
}

/// Keyed-document store with append-with-upsert semantics.
#[async_trait]
pub trait SearchStore: Send + Sync + Debug {
    /// Append `term` to the record for `date`, creating the record if absent.
    async fn append_search(
        &self,
        date: NaiveDate,
        term: &SearchTerm,
    ) -> Result<UpsertAck, StoreError>;

    async fn record(&self, date: NaiveDate) -> Result<Option<SearchRecord>, StoreError>;
}

fn append(
    records: &mut BTreeMap<NaiveDate, Vec<String>>,
    date: NaiveDate,
    term: &SearchTerm,
) -> UpsertAck {
    match records.get_mut(&date) {
        Some(terms) => {
            terms.push(term.as_str().to_owned());
            UpsertAck::appended()
        }
        None => {
            records.insert(date, vec![term.as_str().to_owned()]);
            UpsertAck::inserted(date)
        }
    }
}

/// Records held in process memory; lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<NaiveDate, Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SearchStore for MemoryStore {
    async fn append_search(
        &self,
        date: NaiveDate,
        term: &SearchTerm,
    ) -> Result<UpsertAck, StoreError> {
        let mut records = self.records.lock().await;
        Ok(append(&mut records, date, term))
    }

    async fn record(&self, date: NaiveDate) -> Result<Option<SearchRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records.get(&date).map(|terms| SearchRecord { date, search_terms: terms.clone() }))
    }
}

/// All records kept in a single JSON document on disk.
///
/// Every append is a full read-modify-write of the file, serialized by an
/// in-process lock. Not safe to share one file between processes.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    /// `<platform data dir>/search_terms.json`.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dirs =
            ProjectDirs::from("dev", "forecast", "forecast").ok_or(StoreError::NoDataDir)?;
        Ok(dirs.data_dir().join("search_terms.json"))
    }

    async fn load(&self) -> Result<BTreeMap<NaiveDate, Vec<String>>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => return Err(StoreError::Io { path: self.path.clone(), source }),
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let docs: Vec<SearchRecord> = serde_json::from_str(&contents)
            .map_err(|source| StoreError::Corrupt { path: self.path.clone(), source })?;

        Ok(docs.into_iter().map(|r| (r.date, r.search_terms)).collect())
    }

    async fn save(&self, records: &BTreeMap<NaiveDate, Vec<String>>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
        }

        let docs: Vec<SearchRecord> = records
            .iter()
            .map(|(date, terms)| SearchRecord { date: *date, search_terms: terms.clone() })
            .collect();
        let json = serde_json::to_string_pretty(&docs)?;

        // Written beside the target and renamed over it, so a failed write
        // never leaves a truncated document in place.
        let staging = self.staging_path();
        tokio::fs::write(&staging, json)
            .await
            .map_err(|source| StoreError::Io { path: staging.clone(), source })?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|source| StoreError::Io { path: self.path.clone(), source })
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SearchStore for JsonFileStore {
    async fn append_search(
        &self,
        date: NaiveDate,
        term: &SearchTerm,
    ) -> Result<UpsertAck, StoreError> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        let ack = append(&mut records, date, term);
        self.save(&records).await?;

        tracing::debug!(path = %self.path.display(), %date, "appended search term");
        Ok(ack)
    }

    async fn record(&self, date: NaiveDate) -> Result<Option<SearchRecord>, StoreError> {
        let _guard = self.lock.lock().await;

        let mut records = self.load().await?;
        Ok(records.remove(&date).map(|search_terms| SearchRecord { date, search_terms }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn memory_store_creates_then_appends() {
        let store = MemoryStore::new();

        let first = store.append_search(day(1), &"1,2".into()).await.unwrap();
        assert_eq!(first, UpsertAck::inserted(day(1)));

        let second = store.append_search(day(1), &"3,4".into()).await.unwrap();
        assert_eq!(second, UpsertAck::appended());

        let record = store.record(day(1)).await.unwrap().expect("record exists");
        assert_eq!(record.search_terms, vec!["1,2", "3,4"]);
    }

    #[tokio::test]
    async fn records_are_keyed_by_date() {
        let store = MemoryStore::new();
        store.append_search(day(1), &"1,2".into()).await.unwrap();
        store.append_search(day(2), &"1,2".into()).await.unwrap();

        assert_eq!(store.record(day(1)).await.unwrap().unwrap().search_terms.len(), 1);
        assert_eq!(store.record(day(2)).await.unwrap().unwrap().search_terms.len(), 1);
        assert!(store.record(day(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_terms_are_kept() {
        let store = MemoryStore::new();
        store.append_search(day(1), &"1,2".into()).await.unwrap();
        store.append_search(day(1), &"1,2".into()).await.unwrap();

        let record = store.record(day(1)).await.unwrap().unwrap();
        assert_eq!(record.search_terms, vec!["1,2", "1,2"]);
    }

    #[tokio::test]
    async fn file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("search_terms.json");

        let store = JsonFileStore::new(&path);
        assert!(store.record(day(1)).await.unwrap().is_none());
        store.append_search(day(1), &"10.5,20.25".into()).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::new(&path);
        let ack = reopened.append_search(day(1), &"-1,-2".into()).await.unwrap();
        assert_eq!(ack, UpsertAck::appended());

        let record = reopened.record(day(1)).await.unwrap().unwrap();
        assert_eq!(record.search_terms, vec!["10.5,20.25", "-1,-2"]);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"searchTerms\""));
        assert!(raw.contains("\"2024-03-01\""));
    }

    #[tokio::test]
    async fn file_store_leaves_only_the_final_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("search_terms.json");
        let store = JsonFileStore::new(&path);

        store.append_search(day(1), &"1,2".into()).await.unwrap();
        store.append_search(day(2), &"3,4".into()).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("search_terms.json")]);

        let docs: Vec<SearchRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn stale_staging_file_does_not_block_saves() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("search_terms.json");
        std::fs::write(dir.path().join("search_terms.json.tmp"), "{ trunc").unwrap();

        let store = JsonFileStore::new(&path);
        store.append_search(day(1), &"1,2".into()).await.unwrap();

        assert!(!dir.path().join("search_terms.json.tmp").exists());
        assert_eq!(store.record(day(1)).await.unwrap().unwrap().search_terms, vec!["1,2"]);
    }

    #[tokio::test]
    async fn file_store_reports_corrupt_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("search_terms.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        let err = store.append_search(day(1), &"1,2".into()).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_kept() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path().join("search_terms.json")));

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.append_search(day(1), &SearchTerm::new(format!("{i},{i}"))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = store.record(day(1)).await.unwrap().unwrap();
        assert_eq!(record.search_terms.len(), 8);
    }
}
