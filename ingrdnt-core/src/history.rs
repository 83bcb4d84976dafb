//! Scan history persistence.
//!
//! The scan pipeline hands each finished scan to a [`ScanHistory`] on a
//! best-effort basis. [`JsonlScanHistory`] appends one JSON object per line.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::catalog::ProductRecord;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Product is missing required fields: {0}")]
    MissingFields(&'static str),

    #[error("History I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode history record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("History task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// A stored scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub code: String,
    pub name: String,
    pub image: Option<String>,
    /// The product's `ingredients_text`, as listed.
    pub ingredients: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub nutriscore: Option<String>,
    pub scanned_at: DateTime<Utc>,
}

impl ScanRecord {
    /// Build a record from a product. The code falls back to the catalog's
    /// internal id; a product with no name, or with neither code nor id, is
    /// rejected.
    pub fn from_product(product: &ProductRecord, scanned_at: DateTime<Utc>) -> Result<Self, HistoryError> {
        let name = product.name().trim();
        let code = product.code_or_id();

        let (code, name) = match (code, name.is_empty()) {
            (None, true) => return Err(HistoryError::MissingFields("code and name")),
            (None, false) => return Err(HistoryError::MissingFields("code")),
            (Some(_), true) => return Err(HistoryError::MissingFields("name")),
            (Some(code), false) => (code, name),
        };

        Ok(Self {
            code: code.to_string(),
            name: name.to_string(),
            image: product.image().map(str::to_string),
            ingredients: product.ingredients_text.clone(),
            categories: product.categories_tags.clone(),
            nutriscore: product.nutriscore_grade.clone(),
            scanned_at,
        })
    }
}

#[async_trait]
pub trait ScanHistory: Send + Sync {
    async fn record(&self, record: &ScanRecord) -> Result<(), HistoryError>;

    /// Most recent scans, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ScanRecord>, HistoryError>;
}

/// Append-only JSON Lines history file.
///
/// File access runs on the blocking thread pool.
pub struct JsonlScanHistory {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonlScanHistory {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn append_line(path: &Path, write_lock: &Mutex<()>, record: &ScanRecord) -> Result<(), HistoryError> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    let _guard = write_lock.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?
        .write_all(line.as_bytes())?;
    Ok(())
}

fn read_lines(path: &Path) -> Result<Vec<ScanRecord>, HistoryError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ScanRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(
                path = %path.display(),
                line = line_no + 1,
                error = %e,
                "skipping unreadable history line"
            ),
        }
    }
    Ok(records)
}

#[async_trait]
impl ScanHistory for JsonlScanHistory {
    async fn record(&self, record: &ScanRecord) -> Result<(), HistoryError> {
        let path = self.path.clone();
        let write_lock = Arc::clone(&self.write_lock);
        let owned = record.clone();
        tokio::task::spawn_blocking(move || append_line(&path, &write_lock, &owned)).await??;

        tracing::debug!(code = %record.code, path = %self.path.display(), "scan recorded");
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ScanRecord>, HistoryError> {
        let path = self.path.clone();
        let records = tokio::task::spawn_blocking(move || read_lines(&path)).await??;
        Ok(newest_first(records, limit))
    }
}

/// In-memory history, for tests and runs that should not touch disk.
#[derive(Default)]
pub struct MemoryScanHistory {
    records: Mutex<Vec<ScanRecord>>,
}

impl MemoryScanHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ScanRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ScanHistory for MemoryScanHistory {
    async fn record(&self, record: &ScanRecord) -> Result<(), HistoryError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ScanRecord>, HistoryError> {
        Ok(newest_first(self.records(), limit))
    }
}

fn newest_first(mut records: Vec<ScanRecord>, limit: usize) -> Vec<ScanRecord> {
    // Stable sort keeps later-appended records first among equal timestamps.
    records.reverse();
    records.sort_by(|a, b| b.scanned_at.cmp(&a.scanned_at));
    records.truncate(limit);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn product(code: Option<&str>, id: Option<&str>, name: Option<&str>) -> ProductRecord {
        ProductRecord {
            code: code.map(str::to_string),
            id: id.map(str::to_string),
            product_name: name.map(str::to_string),
            image_front_url: Some("https://img/front.jpg".to_string()),
            ingredients_text: Some("Eau".to_string()),
            ingredients_text_en: Some("Water".to_string()),
            categories_tags: vec!["en:waters".to_string()],
            nutriscore_grade: Some("a".to_string()),
            ..Default::default()
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_record_from_product() {
        let record = ScanRecord::from_product(&product(Some("123"), None, Some("Water")), at(0)).unwrap();
        assert_eq!(record.code, "123");
        assert_eq!(record.name, "Water");
        assert_eq!(record.image.as_deref(), Some("https://img/front.jpg"));
        assert_eq!(record.nutriscore.as_deref(), Some("a"));
        assert_eq!(record.ingredients.as_deref(), Some("Eau"));
    }

    #[test]
    fn test_code_falls_back_to_id() {
        let record = ScanRecord::from_product(&product(None, Some("abc"), Some("Water")), at(0)).unwrap();
        assert_eq!(record.code, "abc");
    }

    #[test]
    fn test_rejects_missing_fields() {
        assert!(matches!(
            ScanRecord::from_product(&product(None, None, None), at(0)),
            Err(HistoryError::MissingFields("code and name"))
        ));
        assert!(matches!(
            ScanRecord::from_product(&product(Some("1"), None, Some("  ")), at(0)),
            Err(HistoryError::MissingFields("name"))
        ));
        assert!(matches!(
            ScanRecord::from_product(&product(None, None, Some("Water")), at(0)),
            Err(HistoryError::MissingFields("code"))
        ));
    }

    #[test]
    fn test_serialized_field_names() {
        let record = ScanRecord::from_product(&product(Some("1"), None, Some("Water")), at(0)).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("scannedAt").is_some());
        assert!(json.get("nutriscore").is_some());
    }

    #[tokio::test]
    async fn test_jsonl_roundtrip_newest_first() {
        let dir = TempDir::new().unwrap();
        let history = JsonlScanHistory::new(dir.path().join("nested").join("history.jsonl"));

        assert!(history.recent(10).await.unwrap().is_empty());

        for (code, secs) in [("1", 10), ("2", 30), ("3", 20)] {
            let record = ScanRecord::from_product(&product(Some(code), None, Some("P")), at(secs)).unwrap();
            history.record(&record).await.unwrap();
        }

        let recent = history.recent(2).await.unwrap();
        let codes: Vec<&str> = recent.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["2", "3"]);
    }

    #[tokio::test]
    async fn test_jsonl_skips_corrupt_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.jsonl");
        let history = JsonlScanHistory::new(path.clone());

        let record = ScanRecord::from_product(&product(Some("1"), None, Some("P")), at(5)).unwrap();
        history.record(&record).await.unwrap();
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"{not json\n")
            .unwrap();

        assert_eq!(history.recent(10).await.unwrap(), vec![record]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_jsonl_concurrent_writes_are_whole_lines() {
        let dir = TempDir::new().unwrap();
        let history = Arc::new(JsonlScanHistory::new(dir.path().join("history.jsonl")));

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..16 {
            let history = Arc::clone(&history);
            tasks.spawn(async move {
                let code = i.to_string();
                let record =
                    ScanRecord::from_product(&product(Some(&code), None, Some("P")), at(i)).unwrap();
                history.record(&record).await.unwrap();
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        assert_eq!(history.recent(100).await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_memory_history() {
        let history = MemoryScanHistory::new();
        let record = ScanRecord::from_product(&product(Some("1"), None, Some("P")), at(5)).unwrap();
        history.record(&record).await.unwrap();
        assert_eq!(history.records().len(), 1);
        assert_eq!(history.recent(0).await.unwrap().len(), 0);
    }
}
