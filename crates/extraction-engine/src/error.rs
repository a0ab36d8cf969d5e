use thiserror::Error;
use tracing::error;

/// Failure surfaced to callers of `ExtractionService::extract`
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("No text could be extracted from the document")]
    EmptyExtraction,
}

/// Failure inside a rasterizer or OCR engine
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("OCR engine unavailable: {0}")]
    OcrUnavailable(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("Failed to render page {page}: {message}")]
    Render { page: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Backend detail (process output, library paths) is logged, never returned
impl From<BackendError> for ExtractionError {
    fn from(err: BackendError) -> Self {
        error!(error = %err, "extraction backend failed");
        let stage = match err {
            BackendError::Render { .. } => "page rendering failed",
            BackendError::OcrUnavailable(_) | BackendError::Ocr(_) | BackendError::Io(_) => {
                "text recognition failed"
            }
        };
        ExtractionError::ExtractionFailed(stage.to_string())
    }
}
