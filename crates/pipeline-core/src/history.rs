//! Per-user analysis history
//!
//! Records are kept newest first and bounded by `retention`; appending
//! beyond the bound evicts the oldest entries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::AnalysisRecord;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("History store error: {0}")]
    Store(String),
}

impl From<std::io::Error> for HistoryError {
    fn from(err: std::io::Error) -> Self {
        HistoryError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::Store(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;

/// `[history]` section of the server config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_retention")]
    pub retention: usize,
}

fn default_retention() -> usize {
    50
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
        }
    }
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Prepend a record to its user's history
    async fn append(&self, record: AnalysisRecord) -> Result<()>;

    /// Newest first
    async fn list(&self, user_id: &str) -> Result<Vec<AnalysisRecord>>;

    async fn get(&self, user_id: &str, record_id: &str) -> Result<Option<AnalysisRecord>>;

    /// Delete every record of a user, returning how many were removed
    async fn clear(&self, user_id: &str) -> Result<usize>;
}

fn prepend_bounded(records: &mut Vec<AnalysisRecord>, record: AnalysisRecord, retention: usize) {
    records.insert(0, record);
    records.truncate(retention);
}

// ============================================================================
// In-Memory Store
// ============================================================================

pub struct MemoryHistoryStore {
    retention: usize,
    records: RwLock<HashMap<String, Vec<AnalysisRecord>>>,
}

impl MemoryHistoryStore {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            retention: config.retention,
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryHistoryStore {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, record: AnalysisRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let entries = records.entry(record.user_id.clone()).or_default();
        prepend_bounded(entries, record, self.retention);
        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<AnalysisRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get(&self, user_id: &str, record_id: &str) -> Result<Option<AnalysisRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(user_id)
            .and_then(|entries| entries.iter().find(|r| r.id == record_id).cloned()))
    }

    async fn clear(&self, user_id: &str) -> Result<usize> {
        Ok(self
            .records
            .write()
            .await
            .remove(user_id)
            .map(|entries| entries.len())
            .unwrap_or(0))
    }
}

// ============================================================================
// JSON File Store
// ============================================================================

/// One JSON file per user:
/// ```text
/// history/
///   {sha256(user-id)}.json   # records, newest first
/// ```
pub struct JsonFileHistoryStore {
    dir: PathBuf,
    retention: usize,
    write_lock: Mutex<()>,
}

impl JsonFileHistoryStore {
    pub async fn new<P: AsRef<Path>>(dir: P, config: HistoryConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            retention: config.retention,
            write_lock: Mutex::new(()),
        })
    }

    /// Fixed-length file name for any user id
    fn user_file(&self, user_id: &str) -> PathBuf {
        let digest = Sha256::digest(user_id.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    async fn load(&self, user_id: &str) -> Result<Vec<AnalysisRecord>> {
        match fs::read_to_string(self.user_file(user_id)).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn store(&self, user_id: &str, records: &[AnalysisRecord]) -> Result<()> {
        let path = self.user_file(user_id);
        let json = serde_json::to_string_pretty(records)?;

        // Write atomically
        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &path).await?;

        Ok(())
    }
}

#[async_trait]
impl HistoryStore for JsonFileHistoryStore {
    async fn append(&self, record: AnalysisRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let user_id = record.user_id.clone();
        let mut records = self.load(&user_id).await?;
        prepend_bounded(&mut records, record, self.retention);
        self.store(&user_id, &records).await
    }

    async fn list(&self, user_id: &str) -> Result<Vec<AnalysisRecord>> {
        let _guard = self.write_lock.lock().await;
        self.load(user_id).await
    }

    async fn get(&self, user_id: &str, record_id: &str) -> Result<Option<AnalysisRecord>> {
        let _guard = self.write_lock.lock().await;
        Ok(self
            .load(user_id)
            .await?
            .into_iter()
            .find(|r| r.id == record_id))
    }

    async fn clear(&self, user_id: &str) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let removed = self.load(user_id).await?.len();
        match fs::remove_file(self.user_file(user_id)).await {
            Ok(()) => Ok(removed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
