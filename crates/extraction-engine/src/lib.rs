//! Document text extraction
//!
//! PDFs are read through their embedded text layer; pages without a usable
//! layer are rasterized and sent to OCR. Images go straight to OCR.
//!
//! OCR runs on blocking threads, at most `workers` pages at a time. Pages
//! come back in document order regardless of completion order.

pub mod config;
pub mod error;
pub mod mime;
pub mod ocr;
pub mod pdf;
pub mod render;

use std::sync::Arc;

use image::DynamicImage;
use shared_types::{DocumentUpload, ExtractionMethod, ExtractionResult, PageRecord};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

pub use config::ExtractionConfig;
pub use error::{BackendError, ExtractionError};
pub use mime::DocumentKind;
pub use ocr::{OcrEngine, OcrProvider, TesseractProvider};
pub use render::{PageRasterizer, PdfiumRasterizer};

enum PageJob {
    Ready(PageRecord),
    Ocr(JoinHandle<Result<PageRecord, ExtractionError>>),
}

/// Extraction entry point
pub struct ExtractionService {
    config: ExtractionConfig,
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrProvider>,
    permits: Arc<Semaphore>,
}

impl ExtractionService {
    pub fn new(
        config: ExtractionConfig,
        rasterizer: Arc<dyn PageRasterizer>,
        ocr: Arc<dyn OcrProvider>,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.workers.max(1)));
        Self {
            config,
            rasterizer,
            ocr,
            permits,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract text from an uploaded document.
    ///
    /// Fails with `UnsupportedFormat` before touching the bytes when the
    /// MIME type is neither PDF nor an image, and with `EmptyExtraction`
    /// when no page yields any text.
    pub async fn extract(
        &self,
        upload: &DocumentUpload,
    ) -> Result<ExtractionResult, ExtractionError> {
        let kind = mime::classify(&upload.mime_type)?;
        let bytes = Arc::new(upload.bytes.clone());

        let result = match kind {
            DocumentKind::Pdf => self.extract_pdf(bytes).await?,
            DocumentKind::Image => self.extract_image(bytes).await?,
        };

        if result.is_blank() {
            info!(file = %upload.file_name, "no text extracted");
            return Err(ExtractionError::EmptyExtraction);
        }

        info!(
            file = %upload.file_name,
            pages = result.pages.len(),
            total_pages = result.total_pages,
            ocr_pages = result.ocr_page_count(),
            chars = result.extracted_text.chars().count(),
            "extraction complete"
        );
        Ok(result)
    }

    async fn extract_pdf(&self, bytes: Arc<Vec<u8>>) -> Result<ExtractionResult, ExtractionError> {
        let max_pages = self.config.max_pages;
        let layer = {
            let bytes = bytes.clone();
            tokio::task::spawn_blocking(move || pdf::read_text_layer(&bytes, max_pages))
                .await
                .map_err(join_failure)??
        };

        let mut jobs = Vec::with_capacity(layer.pages.len());
        for page in layer.pages {
            let page_number = page.page_number;
            match page.text {
                Some(text) if self.config.is_embedded_text(&text) => {
                    debug!(page = page_number, "using embedded text");
                    jobs.push(PageJob::Ready(PageRecord {
                        page_number,
                        text: text.trim().to_string(),
                        method: ExtractionMethod::Embedded,
                    }));
                }
                _ => {
                    debug!(page = page_number, "falling back to OCR");
                    jobs.push(PageJob::Ocr(self.spawn_page_ocr(bytes.clone(), page_number).await?));
                }
            }
        }

        let mut pages = Vec::with_capacity(jobs.len());
        for job in jobs {
            let record = match job {
                PageJob::Ready(record) => record,
                PageJob::Ocr(handle) => handle.await.map_err(join_failure)??,
            };
            pages.push(record);
        }

        Ok(ExtractionResult::from_pages(pages, layer.total_pages))
    }

    async fn spawn_page_ocr(
        &self,
        bytes: Arc<Vec<u8>>,
        page_number: u32,
    ) -> Result<JoinHandle<Result<PageRecord, ExtractionError>>, ExtractionError> {
        let permit = self.acquire_worker().await?;
        let rasterizer = self.rasterizer.clone();
        let ocr = self.ocr.clone();
        let scale = self.config.render_scale;

        Ok(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let image = rasterizer.render(&bytes, page_number as usize - 1, scale)?;
            let text = recognize(ocr.as_ref(), &image)?;
            Ok(PageRecord {
                page_number,
                text,
                method: ExtractionMethod::Ocr,
            })
        }))
    }

    async fn extract_image(
        &self,
        bytes: Arc<Vec<u8>>,
    ) -> Result<ExtractionResult, ExtractionError> {
        let permit = self.acquire_worker().await?;
        let ocr = self.ocr.clone();

        let text = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let image = image::load_from_memory(&bytes).map_err(|e| {
                ExtractionError::ExtractionFailed(format!("Failed to decode image: {}", e))
            })?;
            recognize(ocr.as_ref(), &image)
        })
        .await
        .map_err(join_failure)??;

        let page = PageRecord {
            page_number: 1,
            text,
            method: ExtractionMethod::Ocr,
        };
        Ok(ExtractionResult::from_pages(vec![page], 1))
    }

    async fn acquire_worker(&self) -> Result<tokio::sync::OwnedSemaphorePermit, ExtractionError> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ExtractionError::ExtractionFailed("OCR worker pool closed".to_string()))
    }
}

/// Run one OCR job. The engine is dropped, and so released, on every
/// path out of this function.
fn recognize(provider: &dyn OcrProvider, image: &DynamicImage) -> Result<String, ExtractionError> {
    let mut engine = provider.acquire()?;
    let text = engine.recognize(image)?;
    Ok(text.trim().to_string())
}

fn join_failure(err: tokio::task::JoinError) -> ExtractionError {
    error!(error = %err, "extraction task failed");
    ExtractionError::ExtractionFailed("internal worker failure".to_string())
}
