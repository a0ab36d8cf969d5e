//! Persisted history entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::ExtractionResult;
use crate::types::AnalysisResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Complete,
    Failed,
}

/// Failure taxonomy shared by the pipeline and its callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    UnsupportedFormat,
    ExtractionFailed,
    EmptyExtraction,
    InsufficientTokens,
    InternalError,
}

impl FailureKind {
    pub fn code(self) -> &'static str {
        match self {
            FailureKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            FailureKind::ExtractionFailed => "EXTRACTION_FAILED",
            FailureKind::EmptyExtraction => "EMPTY_EXTRACTION",
            FailureKind::InsufficientTokens => "INSUFFICIENT_TOKENS",
            FailureKind::InternalError => "INTERNAL_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: FailureKind,
    pub message: String,
}

/// One pipeline run, as shown in the user's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub user_id: String,
    pub file_name: String,
    pub upload_date: DateTime<Utc>,
    pub status: RecordStatus,
    pub tokens_used: u32,
    pub extraction_result: Option<ExtractionResult>,
    pub analysis_result: Option<AnalysisResult>,
    pub failure: Option<FailureInfo>,
}

impl AnalysisRecord {
    pub fn completed(
        user_id: &str,
        file_name: &str,
        tokens_used: u32,
        extraction: ExtractionResult,
        analysis: AnalysisResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            file_name: file_name.to_string(),
            upload_date: Utc::now(),
            status: RecordStatus::Complete,
            tokens_used,
            extraction_result: Some(extraction),
            analysis_result: Some(analysis),
            failure: None,
        }
    }

    pub fn failed(
        user_id: &str,
        file_name: &str,
        tokens_used: u32,
        extraction: Option<ExtractionResult>,
        failure: FailureInfo,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            file_name: file_name.to_string(),
            upload_date: Utc::now(),
            status: RecordStatus::Failed,
            tokens_used,
            extraction_result: extraction,
            analysis_result: None,
            failure: Some(failure),
        }
    }
}
