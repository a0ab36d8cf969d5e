//! Server configuration file
//!
//! Every section is optional; missing keys fall back to their defaults.
//!
//! ```toml
//! [extraction]
//! max_pages = 3
//! workers = 2
//!
//! [ocr]
//! binary = "/usr/bin/tesseract"
//! language = "deu"
//!
//! [ledger]
//! starting_balance = 5
//!
//! [history]
//! retention = 50
//!
//! [pipeline]
//! preflight_check = false
//!
//! [payments]
//! credit_secret = "shared-with-the-checkout-service"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use extraction_engine::{ExtractionConfig, TesseractProvider};
use pipeline_core::{HistoryConfig, PipelineConfig};
use serde::{Deserialize, Serialize};
use token_ledger::LedgerConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShieldConfig {
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
}

/// Token credits are accepted only from the payment service, which proves
/// itself with this secret. Without one the credit endpoint is closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default)]
    pub credit_secret: Option<String>,
}

impl ShieldConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }
}

/// Tesseract and pdfium locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    #[serde(default = "default_language")]
    pub language: String,
    /// Page segmentation mode passed as `--psm`
    #[serde(default = "default_psm")]
    pub psm: u8,
    /// Directory with the pdfium shared library (system search path if unset)
    #[serde(default)]
    pub pdfium_dir: Option<PathBuf>,
}

fn default_binary() -> PathBuf {
    PathBuf::from("tesseract")
}

fn default_language() -> String {
    "deu".to_string()
}

fn default_psm() -> u8 {
    3
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            language: default_language(),
            psm: default_psm(),
            pdfium_dir: None,
        }
    }
}

impl OcrConfig {
    pub fn provider(&self) -> TesseractProvider {
        TesseractProvider::new(&self.binary, &self.language).with_psm(self.psm)
    }
}
