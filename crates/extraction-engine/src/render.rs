//! Page rasterization for OCR

use std::path::PathBuf;

use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::debug;

use crate::error::BackendError;

pub trait PageRasterizer: Send + Sync {
    /// Render one page (0-based) at `scale` × 72 DPI
    fn render(&self, pdf: &[u8], page_index: usize, scale: f32)
        -> Result<DynamicImage, BackendError>;
}

/// Pdfium-backed rasterizer. Binds the library per call; the bindings are
/// not shared across threads.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    /// Directory holding the pdfium shared library; system paths otherwise
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }

    fn bind(&self, page: usize) -> Result<Pdfium, BackendError> {
        let bindings = match &self.library_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| BackendError::Render {
            page,
            message: format!("pdfium unavailable: {}", e),
        })?;
        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn render(
        &self,
        pdf: &[u8],
        page_index: usize,
        scale: f32,
    ) -> Result<DynamicImage, BackendError> {
        let render_err = |message: String| BackendError::Render {
            page: page_index,
            message,
        };

        let pdfium = self.bind(page_index)?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| render_err(format!("failed to load PDF: {}", e)))?;

        let index = u16::try_from(page_index)
            .map_err(|_| render_err("page index out of range".to_string()))?;
        let page = document
            .pages()
            .get(index)
            .map_err(|e| render_err(e.to_string()))?;

        let target_width = (page.width().value * scale).round().max(1.0) as i32;
        let config = PdfRenderConfig::new().set_target_width(target_width);

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| render_err(e.to_string()))?;
        let image = bitmap.as_image();

        debug!(
            page = page_index + 1,
            width = image.width(),
            height = image.height(),
            "rendered page for OCR"
        );
        Ok(image)
    }
}
