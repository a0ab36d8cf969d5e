//! Extraction tuning, loadable from the `[extraction]` TOML section

use serde::{Deserialize, Serialize};

/// Configuration for extraction behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Only the first N pages of a PDF are read
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// A page whose trimmed text layer is shorter than this goes to OCR
    #[serde(default = "default_min_embedded_chars")]
    pub min_embedded_chars: usize,
    /// Rasterization scale relative to 72 DPI
    #[serde(default = "default_render_scale")]
    pub render_scale: f32,
    /// Concurrent OCR jobs
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_max_pages() -> usize {
    3
}

fn default_min_embedded_chars() -> usize {
    50
}

fn default_render_scale() -> f32 {
    2.0
}

fn default_workers() -> usize {
    2
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            min_embedded_chars: default_min_embedded_chars(),
            render_scale: default_render_scale(),
            workers: default_workers(),
        }
    }
}

impl ExtractionConfig {
    /// Whether a page's text layer is rich enough to skip OCR
    pub fn is_embedded_text(&self, text: &str) -> bool {
        text.trim().chars().count() >= self.min_embedded_chars
    }
}
