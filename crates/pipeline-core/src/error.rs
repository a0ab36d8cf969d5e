use extraction_engine::ExtractionError;
use shared_types::{FailureInfo, FailureKind};
use thiserror::Error;
use token_ledger::LedgerError;
use tracing::error;

/// Pipeline failure as reported to callers and stored in history
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct PipelineError {
    pub kind: FailureKind,
    pub message: String,
}

impl PipelineError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Log `detail` and return an error with a generic message
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        error!(detail = %detail, "internal pipeline error");
        Self::new(FailureKind::InternalError, "An internal error occurred")
    }

    pub fn to_failure_info(&self) -> FailureInfo {
        FailureInfo {
            kind: self.kind,
            message: self.message.clone(),
        }
    }
}

impl From<ExtractionError> for PipelineError {
    fn from(err: ExtractionError) -> Self {
        let kind = match err {
            ExtractionError::UnsupportedFormat(_) => FailureKind::UnsupportedFormat,
            ExtractionError::ExtractionFailed(_) => FailureKind::ExtractionFailed,
            ExtractionError::EmptyExtraction => FailureKind::EmptyExtraction,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<LedgerError> for PipelineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds { .. } => {
                Self::new(FailureKind::InsufficientTokens, err.to_string())
            }
            other => Self::internal(other),
        }
    }
}

impl From<crate::history::HistoryError> for PipelineError {
    fn from(err: crate::history::HistoryError) -> Self {
        Self::internal(err)
    }
}
