use serde::{Deserialize, Serialize};

/// Category of personally identifiable information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PiiKind {
    Email,
    Phone,
    Amount,
    Date,
    Name,
}

impl PiiKind {
    pub const ALL: [PiiKind; 5] = [
        PiiKind::Email,
        PiiKind::Phone,
        PiiKind::Amount,
        PiiKind::Date,
        PiiKind::Name,
    ];

    /// Replacement token. Contains no digits, `@`, or currency symbols.
    pub fn placeholder(self) -> &'static str {
        match self {
            PiiKind::Email => "[EMAIL_REDACTED]",
            PiiKind::Phone => "[TELEFON_REDACTED]",
            PiiKind::Amount => "[BETRAG_REDACTED]",
            PiiKind::Date => "[DATUM_REDACTED]",
            PiiKind::Name => "[PERSON_REDACTED]",
        }
    }
}

/// Byte range of the input text that was replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedSpan {
    pub start: usize,
    pub end: usize,
    pub kind: PiiKind,
}

impl RedactedSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &RedactedSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactionResult {
    pub redacted_text: String,
    /// Sorted by `start`, non-overlapping
    pub spans: Vec<RedactedSpan>,
}

impl RedactionResult {
    pub fn count_of(&self, kind: PiiKind) -> usize {
        self.spans.iter().filter(|s| s.kind == kind).count()
    }
}
