//! Account persistence
//!
//! Pluggable storage for token balances. The ledger serializes access per
//! user; stores only need to be safe for concurrent calls on different
//! users.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use shared_types::TokenBalance;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};

use crate::error::Result;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Load an account, `None` if the user was never seen
    async fn get(&self, user_id: &str) -> Result<Option<TokenBalance>>;

    /// Insert or replace an account
    async fn save(&self, account: &TokenBalance) -> Result<()>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<String, TokenBalance>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn get(&self, user_id: &str) -> Result<Option<TokenBalance>> {
        Ok(self.accounts.read().await.get(user_id).cloned())
    }

    async fn save(&self, account: &TokenBalance) -> Result<()> {
        self.accounts
            .write()
            .await
            .insert(account.user_id.clone(), account.clone());
        Ok(())
    }
}

// ============================================================================
// JSON File Store
// ============================================================================

/// All accounts in one JSON object keyed by user id
pub struct JsonFileAccountStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileAccountStore {
    /// Open a store at `path`, creating parent directories as needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    async fn load_all(&self) -> Result<BTreeMap<String, TokenBalance>> {
        match fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_all(&self, accounts: &BTreeMap<String, TokenBalance>) -> Result<()> {
        let json = serde_json::to_string_pretty(accounts)?;

        // Write atomically
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}

#[async_trait]
impl AccountStore for JsonFileAccountStore {
    async fn get(&self, user_id: &str) -> Result<Option<TokenBalance>> {
        let _guard = self.write_lock.lock().await;
        Ok(self.load_all().await?.remove(user_id))
    }

    async fn save(&self, account: &TokenBalance) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut accounts = self.load_all().await?;
        accounts.insert(account.user_id.clone(), account.clone());
        self.save_all(&accounts).await
    }
}
