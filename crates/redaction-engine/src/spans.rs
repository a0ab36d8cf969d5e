//! Span bookkeeping
//!
//! Spans always live in input coordinates. A `Rendering` is the input with
//! every span replaced by its placeholder, plus enough layout to map an
//! offset in the rendered text back to the input.

use std::ops::Range;

use shared_types::{PiiKind, RedactedSpan};

#[derive(Debug, Clone, Copy)]
struct Placeholder {
    rendered: (usize, usize),
    source: (usize, usize),
}

pub struct Rendering {
    pub text: String,
    placeholders: Vec<Placeholder>,
}

/// Replace every span (sorted, non-overlapping) with its placeholder
pub fn render(input: &str, spans: &[RedactedSpan]) -> Rendering {
    let mut text = String::with_capacity(input.len());
    let mut placeholders = Vec::with_capacity(spans.len());
    let mut cursor = 0;

    for span in spans {
        text.push_str(&input[cursor..span.start]);
        let rendered_start = text.len();
        text.push_str(span.kind.placeholder());
        placeholders.push(Placeholder {
            rendered: (rendered_start, text.len()),
            source: (span.start, span.end),
        });
        cursor = span.end;
    }
    text.push_str(&input[cursor..]);

    Rendering { text, placeholders }
}

impl Rendering {
    /// Map a match in rendered text to the input range it stands for.
    /// A boundary falling inside a placeholder widens to the whole span.
    pub fn to_source(&self, range: Range<usize>) -> Range<usize> {
        self.source_start(range.start)..self.source_end(range.end)
    }

    fn source_start(&self, offset: usize) -> usize {
        let mut shift: isize = 0;
        for p in &self.placeholders {
            if offset < p.rendered.0 {
                break;
            }
            if offset < p.rendered.1 {
                return p.source.0;
            }
            shift = p.source.1 as isize - p.rendered.1 as isize;
        }
        (offset as isize + shift) as usize
    }

    fn source_end(&self, offset: usize) -> usize {
        let mut shift: isize = 0;
        for p in &self.placeholders {
            if offset <= p.rendered.0 {
                break;
            }
            if offset <= p.rendered.1 {
                return p.source.1;
            }
            shift = p.source.1 as isize - p.rendered.1 as isize;
        }
        (offset as isize + shift) as usize
    }
}

/// Pick non-overlapping matches: earlier detector wins, then leftmost.
/// `candidates` is grouped by detector in priority order.
pub fn select(candidates: Vec<(PiiKind, Vec<Range<usize>>)>) -> Vec<(PiiKind, Range<usize>)> {
    let mut accepted: Vec<(PiiKind, Range<usize>)> = Vec::new();
    for (kind, ranges) in candidates {
        for range in ranges {
            let clashes = accepted
                .iter()
                .any(|(_, r)| range.start < r.end && r.start < range.end);
            if !clashes {
                accepted.push((kind, range));
            }
        }
    }
    accepted.sort_by_key(|(_, r)| r.start);
    accepted
}

/// Merge new spans into existing ones. An existing span touched by a new
/// one is absorbed; new spans that overlap each other are coalesced and
/// keep the kind of the leftmost.
pub fn absorb(existing: Vec<RedactedSpan>, mut incoming: Vec<RedactedSpan>) -> Vec<RedactedSpan> {
    incoming.sort_by_key(|s| s.start);

    let mut coalesced: Vec<RedactedSpan> = Vec::with_capacity(incoming.len());
    for span in incoming {
        match coalesced.last_mut() {
            Some(last) if span.start < last.end => last.end = last.end.max(span.end),
            _ => coalesced.push(span),
        }
    }

    let mut merged: Vec<RedactedSpan> = existing
        .into_iter()
        .filter(|old| !coalesced.iter().any(|new| new.overlaps(old)))
        .collect();
    merged.extend(coalesced);
    merged.sort_by_key(|s| s.start);
    merged
}
