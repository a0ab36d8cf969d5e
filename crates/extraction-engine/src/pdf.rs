//! Per-page text layer via lopdf

use lopdf::Document;
use tracing::debug;

use crate::error::ExtractionError;

/// Text layer of one page. `text` is `None` when the layer could not be
/// decoded.
#[derive(Debug, Clone)]
pub struct PageText {
    /// 1-based page number
    pub page_number: u32,
    pub text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TextLayer {
    pub total_pages: u32,
    pub pages: Vec<PageText>,
}

/// Read the text layer of the first `max_pages` pages
pub fn read_text_layer(bytes: &[u8], max_pages: usize) -> Result<TextLayer, ExtractionError> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| ExtractionError::ExtractionFailed(format!("Failed to parse PDF: {}", e)))?;

    let page_map = doc.get_pages();
    let total_pages = u32::try_from(page_map.len()).unwrap_or(u32::MAX);

    let pages = page_map
        .keys()
        .take(max_pages)
        .zip(1u32..)
        .map(|(&page_no, page_number)| {
            let text = match doc.extract_text(&[page_no]) {
                Ok(text) => Some(text),
                Err(e) => {
                    debug!(page = page_number, error = %e, "text layer unreadable");
                    None
                }
            };
            PageText { page_number, text }
        })
        .collect();

    Ok(TextLayer { total_pages, pages })
}

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::{dictionary, Dictionary, Document, Object, Stream};

    /// Build a PDF with one page per entry; `None` leaves the page without
    /// any text operators.
    pub fn create_test_pdf(pages: &[Option<&str>]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");

        let pages_id = doc.new_object_id();
        let catalog_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let mut page_ids = Vec::new();
        for text in pages {
            let content = match text {
                Some(text) => format!("BT /F1 12 Tf 50 700 Td ({}) Tj ET", text),
                None => String::new(),
            };
            let content_id =
                doc.add_object(Object::Stream(Stream::new(Dictionary::new(), content.into_bytes())));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => font_id },
                },
            });
            page_ids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => pages.len() as i64,
                "Kids" => page_ids,
            }),
        );
        doc.objects.insert(
            catalog_id,
            Object::Dictionary(dictionary! {
                "Type" => "Catalog",
                "Pages" => pages_id,
            }),
        );
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::create_test_pdf;
    use super::*;

    #[test]
    fn test_reads_only_first_pages() {
        let pdf = create_test_pdf(&[Some("Eins"), Some("Zwei"), Some("Drei"), Some("Vier")]);
        let layer = read_text_layer(&pdf, 3).unwrap();
        assert_eq!(layer.total_pages, 4);
        assert_eq!(layer.pages.len(), 3);
        assert_eq!(layer.pages[2].page_number, 3);
        let first = layer.pages[0].text.as_deref().unwrap_or_default();
        assert!(first.contains("Eins"), "{:?}", first);
    }

    #[test]
    fn test_garbage_is_extraction_failure() {
        let err = read_text_layer(b"definitely not a pdf", 3).unwrap_err();
        assert!(matches!(err, ExtractionError::ExtractionFailed(_)));
    }

    #[test]
    fn test_blank_page_has_no_usable_text() {
        let pdf = create_test_pdf(&[None]);
        let layer = read_text_layer(&pdf, 3).unwrap();
        let text = layer.pages[0].text.clone().unwrap_or_default();
        assert!(text.trim().is_empty());
    }
}
