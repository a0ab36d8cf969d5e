use serde::{Deserialize, Serialize};

/// Per-user consumable credit account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub user_id: String,
    pub balance: u32,
    /// High-water mark of `balance`; never below it
    pub cap: u32,
}

impl TokenBalance {
    pub fn new(user_id: impl Into<String>, starting_balance: u32) -> Self {
        Self {
            user_id: user_id.into(),
            balance: starting_balance,
            cap: starting_balance,
        }
    }

    pub fn can_afford(&self, amount: u32) -> bool {
        self.balance >= amount
    }
}
