//! PII redaction for extracted document text
//!
//! Replaces e-mail addresses, phone numbers, monetary amounts, dates and
//! known names with fixed placeholder tokens before text leaves the
//! extraction stage.

pub mod detectors;
mod spans;

use std::ops::Range;

use lazy_static::lazy_static;
use shared_types::{PiiKind, RedactedSpan, RedactionResult};
use tracing::{debug, warn};

pub use detectors::{default_detectors, Detector, NameList, DEFAULT_NAMES};

lazy_static! {
    static ref DEFAULT_REDACTOR: Redactor = Redactor::new();
}

/// Redact with the default detector set
pub fn redact(text: &str) -> RedactionResult {
    DEFAULT_REDACTOR.redact(text)
}

/// Detector set applied in priority order
#[derive(Debug, Clone)]
pub struct Redactor {
    detectors: Vec<Detector>,
}

impl Redactor {
    pub fn new() -> Self {
        Self {
            detectors: default_detectors(),
        }
    }

    /// Replace the name list used by the name detector. An empty list
    /// disables name detection.
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.detectors.retain(|d| !matches!(d, Detector::Name(_)));
        if let Some(list) = NameList::new(names) {
            self.detectors.push(Detector::Name(list));
        }
        self
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Redact until no detector matches the output.
    ///
    /// Each round detects on the current rendering. Replacing a match can
    /// expose a new one across the placeholder boundary, so rounds repeat
    /// while they change the span set. A round that maps back onto the
    /// spans it started from ends the loop. The returned spans are in input
    /// coordinates.
    pub fn redact(&self, text: &str) -> RedactionResult {
        let mut spans: Vec<RedactedSpan> = Vec::new();
        let mut rounds = 0usize;

        loop {
            let rendering = spans::render(text, &spans);
            let found = self.detect(&rendering.text);

            if found.is_empty() {
                debug!(spans = spans.len(), rounds, "redaction complete");
                return RedactionResult {
                    redacted_text: rendering.text,
                    spans,
                };
            }

            let mapped = found
                .into_iter()
                .map(|(kind, range)| {
                    let source = rendering.to_source(range);
                    RedactedSpan {
                        start: source.start,
                        end: source.end,
                        kind,
                    }
                })
                .collect();
            let next = spans::absorb(spans.clone(), mapped);
            if next == spans {
                warn!(spans = spans.len(), rounds, "redaction reached a fixed point with matches left");
                return RedactionResult {
                    redacted_text: rendering.text,
                    spans,
                };
            }
            spans = next;
            rounds += 1;
        }
    }

    fn detect(&self, text: &str) -> Vec<(PiiKind, Range<usize>)> {
        let candidates = self
            .detectors
            .iter()
            .map(|d| (d.kind(), d.find(text)))
            .collect();
        spans::select(candidates)
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new()
    }
}
