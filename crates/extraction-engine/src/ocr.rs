//! OCR engines
//!
//! An `OcrProvider` hands out one engine per job. The engine is released
//! when the box is dropped, so every exit path of a job releases it.

use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;
use tempfile::TempDir;
use tracing::debug;

use crate::error::BackendError;

pub trait OcrEngine: Send {
    fn recognize(&mut self, image: &DynamicImage) -> Result<String, BackendError>;
}

pub trait OcrProvider: Send + Sync {
    fn acquire(&self) -> Result<Box<dyn OcrEngine>, BackendError>;
}

/// Tesseract CLI settings
#[derive(Debug, Clone)]
pub struct TesseractProvider {
    binary: PathBuf,
    language: String,
    /// Page segmentation mode (`--psm`)
    psm: u8,
}

impl TesseractProvider {
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            psm: 3,
        }
    }

    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = psm;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }
}

impl Default for TesseractProvider {
    fn default() -> Self {
        Self::new("tesseract", "deu")
    }
}

impl OcrProvider for TesseractProvider {
    fn acquire(&self) -> Result<Box<dyn OcrEngine>, BackendError> {
        let workdir = tempfile::Builder::new().prefix("ocr-").tempdir()?;
        Ok(Box::new(TesseractEngine {
            binary: self.binary.clone(),
            language: self.language.clone(),
            psm: self.psm,
            workdir,
            images: 0,
        }))
    }
}

/// One acquired tesseract job. Its scratch directory is removed on drop.
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
    psm: u8,
    workdir: TempDir,
    images: usize,
}

impl TesseractEngine {
    fn recognize_file(&self, path: &Path) -> Result<String, BackendError> {
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    BackendError::OcrUnavailable(format!("{} not found", self.binary.display()))
                }
                _ => BackendError::Io(e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Ocr(stderr.trim().to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&mut self, image: &DynamicImage) -> Result<String, BackendError> {
        let n = self.images;
        self.images += 1;
        let input = self.workdir.path().join(format!("input-{}.png", n));

        image
            .save(&input)
            .map_err(|e| BackendError::Ocr(format!("Failed to write OCR input: {}", e)))?;

        let text = self.recognize_file(&input)?;
        debug!(
            chars = text.len(),
            width = image.width(),
            height = image.height(),
            "tesseract recognized image"
        );
        Ok(text)
    }
}
