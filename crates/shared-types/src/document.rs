//! Upload payload and extraction output

use serde::{Deserialize, Serialize};

/// Separator placed between page texts in `ExtractionResult::extracted_text`
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Transient document handed to the pipeline. Never persisted.
#[derive(Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

// Hand-written so document bytes never end up in logs
impl std::fmt::Debug for DocumentUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentUpload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// How a page's text was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Embedded,
    Ocr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub page_number: u32, // 1-based
    pub text: String,
    pub method: ExtractionMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub pages: Vec<PageRecord>,
    pub extracted_text: String,
    /// Page count of the source document, before the page bound was applied
    pub total_pages: u32,
}

impl ExtractionResult {
    /// Build a result from pages already sorted by page number
    pub fn from_pages(pages: Vec<PageRecord>, total_pages: u32) -> Self {
        let extracted_text = pages
            .iter()
            .map(|p| p.text.trim_end())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join(PAGE_SEPARATOR);

        Self {
            pages,
            extracted_text,
            total_pages,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.extracted_text.trim().is_empty()
    }

    pub fn ocr_page_count(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| p.method == ExtractionMethod::Ocr)
            .count()
    }

    /// True when the page bound cut off part of the document
    pub fn truncated(&self) -> bool {
        (self.pages.len() as u32) < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page(n: u32, text: &str, method: ExtractionMethod) -> PageRecord {
        PageRecord {
            page_number: n,
            text: text.to_string(),
            method,
        }
    }

    #[test]
    fn test_concatenates_pages_in_order() {
        let result = ExtractionResult::from_pages(
            vec![
                page(1, "Erste Seite\n", ExtractionMethod::Embedded),
                page(2, "Zweite Seite", ExtractionMethod::Ocr),
            ],
            2,
        );
        assert_eq!(result.extracted_text, "Erste Seite\n\nZweite Seite");
        assert_eq!(result.ocr_page_count(), 1);
        assert!(!result.truncated());
    }

    #[test]
    fn test_blank_pages_do_not_add_separators() {
        let result = ExtractionResult::from_pages(
            vec![
                page(1, "   ", ExtractionMethod::Ocr),
                page(2, "Inhalt", ExtractionMethod::Embedded),
            ],
            5,
        );
        assert_eq!(result.extracted_text, "Inhalt");
        assert!(result.truncated());
    }

    #[test]
    fn test_all_blank_pages_is_blank() {
        let result =
            ExtractionResult::from_pages(vec![page(1, " \n\t", ExtractionMethod::Ocr)], 1);
        assert!(result.is_blank());
    }

    #[test]
    fn test_debug_hides_bytes() {
        let upload = DocumentUpload::new("a.pdf", "application/pdf", vec![1, 2, 3]);
        let rendered = format!("{:?}", upload);
        assert!(rendered.contains("len: 3"));
        assert!(!rendered.contains("[1, 2, 3]"));
    }
}
