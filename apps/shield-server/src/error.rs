//! Error types for the Privacy Shield server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pipeline_core::{HistoryError, PipelineError};
use serde::Serialize;
use shared_types::FailureKind;
use thiserror::Error;
use token_ledger::LedgerError;
use tracing::error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// A pipeline run failed; the kind decides the status
    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("Missing x-user-id header")]
    MissingUser,

    #[error("Credits are only accepted from the payment service")]
    CreditForbidden,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown token pack: {0}")]
    UnknownPack(String),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

fn pipeline_status(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::UnsupportedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        FailureKind::ExtractionFailed => StatusCode::INTERNAL_SERVER_ERROR,
        FailureKind::EmptyExtraction => StatusCode::UNPROCESSABLE_ENTITY,
        FailureKind::InsufficientTokens => StatusCode::PAYMENT_REQUIRED,
        FailureKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ServerError::Pipeline(err) => (
                pipeline_status(err.kind),
                err.kind.code(),
                err.message.clone(),
            ),
            ServerError::MissingUser => (
                StatusCode::UNAUTHORIZED,
                "MISSING_USER",
                self.to_string(),
            ),
            ServerError::CreditForbidden => (
                StatusCode::FORBIDDEN,
                "CREDIT_FORBIDDEN",
                self.to_string(),
            ),
            ServerError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", msg.clone())
            }
            ServerError::UnknownPack(id) => (
                StatusCode::NOT_FOUND,
                "UNKNOWN_PACK",
                format!("Token pack '{}' not found", id),
            ),
            ServerError::RecordNotFound(id) => (
                StatusCode::NOT_FOUND,
                "RECORD_NOT_FOUND",
                format!("Record '{}' not found", id),
            ),
            ServerError::Internal(detail) => {
                error!(detail = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ServerError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownPack(id) => ServerError::UnknownPack(id),
            LedgerError::InvalidAmount => ServerError::InvalidRequest(err.to_string()),
            other => ServerError::Pipeline(other.into()),
        }
    }
}

impl From<HistoryError> for ServerError {
    fn from(err: HistoryError) -> Self {
        ServerError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ServerError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_failure_kinds_map_to_statuses() {
        let cases = [
            (FailureKind::UnsupportedFormat, StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (FailureKind::ExtractionFailed, StatusCode::INTERNAL_SERVER_ERROR),
            (FailureKind::EmptyExtraction, StatusCode::UNPROCESSABLE_ENTITY),
            (FailureKind::InsufficientTokens, StatusCode::PAYMENT_REQUIRED),
            (FailureKind::InternalError, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (kind, status) in cases {
            let err = ServerError::Pipeline(PipelineError::new(kind, "x"));
            assert_eq!(status_of(err), status, "{:?}", kind);
        }
    }

    #[test]
    fn test_ledger_errors() {
        let err: ServerError = LedgerError::InsufficientFunds {
            requested: 1,
            available: 0,
        }
        .into();
        assert_eq!(status_of(err), StatusCode::PAYMENT_REQUIRED);

        let err: ServerError = LedgerError::UnknownPack("gold".into()).into();
        assert_eq!(status_of(err), StatusCode::NOT_FOUND);

        let err: ServerError = LedgerError::Store("disk".into()).into();
        assert_eq!(status_of(err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_client_errors() {
        assert_eq!(status_of(ServerError::MissingUser), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(ServerError::CreditForbidden), StatusCode::FORBIDDEN);
        assert_eq!(
            status_of(ServerError::InvalidRequest("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ServerError::RecordNotFound("abc".into())),
            StatusCode::NOT_FOUND
        );
    }
}
