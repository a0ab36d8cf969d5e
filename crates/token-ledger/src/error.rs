use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient tokens: {requested} required, {available} available")]
    InsufficientFunds { requested: u32, available: u32 },

    #[error("Token amount must be positive")]
    InvalidAmount,

    #[error("Unknown token pack: {0}")]
    UnknownPack(String),

    #[error("Account store error: {0}")]
    Store(String),
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Store(err.to_string())
    }
}
