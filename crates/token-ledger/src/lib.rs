//! Per-user consumable token ledger
//!
//! Every paid pipeline stage debits the caller's account first. Accounts are
//! created lazily with a starting balance; `cap` tracks the highest balance
//! the account has ever held.
//!
//! Operations on one account are serialized with a keyed async mutex: the
//! account is read, checked and saved while the user's lock is held.

pub mod error;
pub mod packs;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared_types::TokenBalance;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

pub use error::{LedgerError, Result};
pub use packs::{find_pack, TokenPack, TOKEN_PACKS};
pub use store::{AccountStore, JsonFileAccountStore, MemoryAccountStore};

/// `[ledger]` section of the server config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_starting_balance")]
    pub starting_balance: u32,
}

fn default_starting_balance() -> u32 {
    5
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            starting_balance: default_starting_balance(),
        }
    }
}

/// Published after every successful mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceUpdate {
    pub user_id: String,
    pub balance: u32,
    pub cap: u32,
    /// Signed change applied by the mutation
    pub delta: i64,
}

pub struct TokenLedger {
    store: Arc<dyn AccountStore>,
    config: LedgerConfig,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    updates: broadcast::Sender<BalanceUpdate>,
}

impl TokenLedger {
    pub fn new(store: Arc<dyn AccountStore>, config: LedgerConfig) -> Self {
        let (updates, _) = broadcast::channel(100);
        Self {
            store,
            config,
            locks: Mutex::new(HashMap::new()),
            updates,
        }
    }

    /// Ledger over an in-memory store with default settings
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryAccountStore::new()), LedgerConfig::default())
    }

    /// Receive a `BalanceUpdate` for every debit and credit
    pub fn subscribe(&self) -> broadcast::Receiver<BalanceUpdate> {
        self.updates.subscribe()
    }

    pub async fn balance(&self, user_id: &str) -> Result<TokenBalance> {
        let lock = self.account_lock(user_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.load_or_create(user_id).await
        };
        self.release_lock(user_id, lock).await;
        result
    }

    /// Remove `amount` tokens. Fails without any change when the balance is
    /// too low.
    pub async fn debit(&self, user_id: &str, amount: u32) -> Result<TokenBalance> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let lock = self.account_lock(user_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.debit_locked(user_id, amount).await
        };
        self.release_lock(user_id, lock).await;
        result
    }

    /// Add `amount` tokens, raising the cap when the new balance exceeds it
    pub async fn credit(&self, user_id: &str, amount: u32) -> Result<TokenBalance> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        let lock = self.account_lock(user_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.credit_locked(user_id, amount).await
        };
        self.release_lock(user_id, lock).await;
        result
    }

    pub async fn credit_pack(&self, user_id: &str, pack_id: &str) -> Result<TokenBalance> {
        let pack = find_pack(pack_id).ok_or_else(|| LedgerError::UnknownPack(pack_id.to_string()))?;
        self.credit(user_id, pack.tokens).await
    }

    async fn debit_locked(&self, user_id: &str, amount: u32) -> Result<TokenBalance> {
        let mut account = self.load_or_create(user_id).await?;
        if !account.can_afford(amount) {
            debug!(user = user_id, amount, balance = account.balance, "debit refused");
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: account.balance,
            });
        }

        account.balance -= amount;
        self.store.save(&account).await?;

        debug!(user = user_id, amount, balance = account.balance, "debited");
        self.publish(&account, -i64::from(amount));
        Ok(account)
    }

    async fn credit_locked(&self, user_id: &str, amount: u32) -> Result<TokenBalance> {
        let mut account = self.load_or_create(user_id).await?;
        account.balance = account.balance.saturating_add(amount);
        account.cap = account.cap.max(account.balance);
        self.store.save(&account).await?;

        info!(user = user_id, amount, balance = account.balance, "credited");
        self.publish(&account, i64::from(amount));
        Ok(account)
    }

    async fn account_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(user_id.to_string()).or_default().clone()
    }

    /// Drop the map entry once no other task holds or waits on it. Handles
    /// are only cloned under the map lock, so the count cannot grow here.
    async fn release_lock(&self, user_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(user_id);
        }
    }

    /// Caller must hold the user's lock
    async fn load_or_create(&self, user_id: &str) -> Result<TokenBalance> {
        if let Some(account) = self.store.get(user_id).await? {
            return Ok(account);
        }
        let account = TokenBalance::new(user_id, self.config.starting_balance);
        self.store.save(&account).await?;
        info!(user = user_id, balance = account.balance, "account created");
        Ok(account)
    }

    fn publish(&self, account: &TokenBalance, delta: i64) {
        // No subscribers is fine
        let _ = self.updates.send(BalanceUpdate {
            user_id: account.user_id.clone(),
            balance: account.balance,
            cap: account.cap,
            delta,
        });
    }
}
