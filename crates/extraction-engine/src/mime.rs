use crate::error::ExtractionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Image,
}

/// Classify a declared MIME type. Case-insensitive; parameters after `;`
/// are ignored.
pub fn classify(mime_type: &str) -> Result<DocumentKind, ExtractionError> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "application/pdf" {
        Ok(DocumentKind::Pdf)
    } else if essence
        .strip_prefix("image/")
        .is_some_and(|subtype| !subtype.is_empty())
    {
        Ok(DocumentKind::Image)
    } else {
        Err(ExtractionError::UnsupportedFormat(mime_type.to_string()))
    }
}
