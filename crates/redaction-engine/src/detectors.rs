//! PII detectors
//!
//! Each detector is a pattern over plain text returning byte ranges. The
//! order of `Detector` variants in a `Redactor` is its priority order when
//! matches from different detectors overlap.

use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;
use shared_types::PiiKind;
use tracing::warn;

lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();

    // Optional country code, then 3-3-4 digit groups
    static ref PHONE: Regex =
        Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap();

    // Symbol before the number, or symbol / ISO code after it
    static ref AMOUNT: Regex = Regex::new(
        r"[$€£]\s?\d+(?:[.,]\d{3})*(?:[.,]\d{1,2})?|\b\d+(?:[.,]\d{3})*(?:[.,]\d{1,2})?\s?(?:[$€£]|(?i:usd|euro?|gbp|chf)\b)"
    )
    .unwrap();

    static ref DATE: Regex = Regex::new(r"\b\d{1,2}[./-]\d{1,2}[./-]\d{2,4}\b").unwrap();
}

/// Stand-in for named-entity recognition: literal names matched
/// case-insensitively as whole words.
pub const DEFAULT_NAMES: &[&str] = &[
    "John Doe",
    "Jane Smith",
    "Max Mustermann",
    "Erika Mustermann",
    "Acme Corp",
];

/// Compiled whole-word, case-insensitive alternation over a name list
#[derive(Debug, Clone)]
pub struct NameList {
    pattern: Regex,
}

impl NameList {
    /// Returns `None` when the list has no non-blank names
    pub fn new<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .filter(|n| !matches_placeholder(n))
            .collect();
        if names.is_empty() {
            return None;
        }

        // Longest first so "Max Mustermann" wins over a shorter prefix entry
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));
        names.dedup();

        let alternation = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).ok()?;
        Some(Self { pattern })
    }
}

/// A name found inside a placeholder would be re-detected on every round.
/// Word-boundary assertions depend on the neighbours, so each placeholder is
/// tried with and without adjacent word characters.
fn matches_placeholder(name: &str) -> bool {
    let Ok(pattern) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(name))) else {
        return false;
    };
    let hit = PiiKind::ALL.iter().any(|kind| {
        let placeholder = kind.placeholder();
        [("", ""), ("a", ""), ("", "a"), ("a", "a")]
            .iter()
            .any(|(before, after)| {
                let haystack = format!("{}{}{}", before, placeholder, after);
                let inner = before.len()..before.len() + placeholder.len();
                pattern
                    .find_iter(&haystack)
                    .any(|m| m.start() >= inner.start && m.end() <= inner.end)
            })
    });
    if hit {
        warn!(name, "name list entry matches a placeholder, ignored");
    }
    hit
}

/// Tagged detector set
#[derive(Debug, Clone)]
pub enum Detector {
    Email,
    Phone,
    Amount,
    Date,
    Name(NameList),
}

impl Detector {
    pub fn kind(&self) -> PiiKind {
        match self {
            Detector::Email => PiiKind::Email,
            Detector::Phone => PiiKind::Phone,
            Detector::Amount => PiiKind::Amount,
            Detector::Date => PiiKind::Date,
            Detector::Name(_) => PiiKind::Name,
        }
    }

    /// Non-overlapping matches, left to right
    pub fn find(&self, text: &str) -> Vec<Range<usize>> {
        let re: &Regex = match self {
            Detector::Email => &EMAIL,
            Detector::Phone => &PHONE,
            Detector::Amount => &AMOUNT,
            Detector::Date => &DATE,
            Detector::Name(names) => &names.pattern,
        };
        re.find_iter(text)
            .filter(|m| !m.is_empty())
            .map(|m| m.range())
            .collect()
    }
}

/// Default detector set in priority order
pub fn default_detectors() -> Vec<Detector> {
    let mut detectors = vec![
        Detector::Email,
        Detector::Phone,
        Detector::Amount,
        Detector::Date,
    ];
    if let Some(names) = NameList::new(DEFAULT_NAMES) {
        detectors.push(Detector::Name(names));
    }
    detectors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches<'a>(detector: &Detector, text: &'a str) -> Vec<&'a str> {
        detector.find(text).into_iter().map(|r| &text[r]).collect()
    }

    #[test]
    fn test_email() {
        assert_eq!(
            matches(&Detector::Email, "Kontakt: max@firm.de, info@example.co.uk"),
            vec!["max@firm.de", "info@example.co.uk"]
        );
        assert!(matches(&Detector::Email, "kein at-zeichen hier").is_empty());
    }

    #[test]
    fn test_phone() {
        assert_eq!(
            matches(&Detector::Phone, "Tel: +49 151 234 5678"),
            vec!["+49 151 234 5678"]
        );
        assert_eq!(
            matches(&Detector::Phone, "Call (555) 123-4567 now"),
            vec!["(555) 123-4567"]
        );
        assert_eq!(matches(&Detector::Phone, "030 123 4567"), vec!["030 123 4567"]);
    }

    #[test]
    fn test_amount() {
        assert_eq!(matches(&Detector::Amount, "Betrag 500€."), vec!["500€"]);
        assert_eq!(matches(&Detector::Amount, "Fee: $1,500.00"), vec!["$1,500.00"]);
        assert_eq!(
            matches(&Detector::Amount, "Summe 1.234,56 EUR netto"),
            vec!["1.234,56 EUR"]
        );
        assert_eq!(matches(&Detector::Amount, "€ 99 pro Monat"), vec!["€ 99"]);
        assert_eq!(matches(&Detector::Amount, "2.500 CHF"), vec!["2.500 CHF"]);
        assert_eq!(matches(&Detector::Amount, "1500€"), vec!["1500€"]);
    }

    #[test]
    fn test_amount_requires_currency() {
        assert!(matches(&Detector::Amount, "3 Monate, Paragraph 12").is_empty());
        assert!(matches(&Detector::Amount, "500 Europäer").is_empty());
    }

    #[test]
    fn test_date() {
        assert_eq!(
            matches(&Detector::Date, "vom 01.02.2024 bis 1/3/24"),
            vec!["01.02.2024", "1/3/24"]
        );
        assert_eq!(matches(&Detector::Date, "15-06-2023"), vec!["15-06-2023"]);
    }

    #[test]
    fn test_names_are_whole_word_and_case_insensitive() {
        let names = NameList::new(DEFAULT_NAMES).unwrap();
        let detector = Detector::Name(names);
        assert_eq!(
            matches(&detector, "Vertrag mit MAX MUSTERMANN und acme corp"),
            vec!["MAX MUSTERMANN", "acme corp"]
        );
        assert!(matches(&detector, "JohnDoe und Acme Corporation").is_empty());
    }

    #[test]
    fn test_name_list_escapes_metacharacters() {
        let names = NameList::new(["J. R. Ewing"]).unwrap();
        let detector = Detector::Name(names);
        assert_eq!(matches(&detector, "Herr J. R. Ewing kommt"), vec!["J. R. Ewing"]);
        assert!(matches(&detector, "Herr JX RX Ewing").is_empty());
    }

    #[test]
    fn test_empty_name_list_is_none() {
        assert!(NameList::new(Vec::<String>::new()).is_none());
        assert!(NameList::new(["  "]).is_none());
    }

    #[test]
    fn test_names_matching_placeholders_are_dropped() {
        assert!(NameList::new(["person_redacted"]).is_none());
        assert!(NameList::new(["[EMAIL_REDACTED]", "Betrag_Redacted"]).is_none());

        let names = NameList::new(["John Doe", "PERSON_REDACTED"]).unwrap();
        let detector = Detector::Name(names);
        assert!(detector.find("[PERSON_REDACTED]").is_empty());
        assert_eq!(matches(&detector, "mit John Doe"), vec!["John Doe"]);
    }

    #[test]
    fn test_placeholders_match_no_detector() {
        let mut all = default_detectors();
        all.push(Detector::Name(NameList::new(["Redacted", "Email"]).unwrap()));
        for detector in &all {
            for kind in [
                PiiKind::Email,
                PiiKind::Phone,
                PiiKind::Amount,
                PiiKind::Date,
                PiiKind::Name,
            ] {
                assert!(detector.find(kind.placeholder()).is_empty());
            }
        }
    }
}
