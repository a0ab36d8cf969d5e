//! Keyword dictionaries for contract risk detection
//!
//! Order matters: findings are emitted in declaration order, and the
//! index of an entry is part of its finding id.

use serde::Serialize;

/// A dictionary entry: lower-case keyword plus the note shown to the user
#[derive(Debug, Clone, Copy, Serialize)]
pub struct KeywordRule {
    pub word: &'static str,
    pub context: &'static str,
}

/// Clauses that usually warrant a lawyer's look
pub const CRITICAL_KEYWORDS: &[KeywordRule] = &[
    KeywordRule {
        word: "haftung",
        context: "Haftungsbeschränkung gefunden. Prüfen Sie Obergrenzen.",
    },
    KeywordRule {
        word: "kündigung",
        context: "Kündigungsfristen identifiziert. Sind diese angemessen?",
    },
    KeywordRule {
        word: "strafe",
        context: "Vertragsstrafen gefunden. Standardmäßig oft unwirksam.",
    },
    KeywordRule {
        word: "exklusiv",
        context: "Exklusivitätsklausel entdeckt. Schränkt Handlungsfreiheit ein.",
    },
    KeywordRule {
        word: "wettbewerb",
        context: "Wettbewerbsverbot gefunden. Prüfen Sie Dauer und Karenzentschädigung.",
    },
    KeywordRule {
        word: "datenschutz",
        context: "Datenschutzklauseln gefunden. DSGVO-Konformität sicherstellen.",
    },
    KeywordRule {
        word: "schadenersatz",
        context: "Schadenersatzregelungen entdeckt.",
    },
];

/// Clauses worth knowing about but rarely problematic on their own
pub const WARNING_KEYWORDS: &[KeywordRule] = &[
    KeywordRule {
        word: "automatisch",
        context: "Automatische Verlängerung des Vertrags möglich.",
    },
    KeywordRule {
        word: "preisanpassung",
        context: "Preisanpassungsklausel gefunden.",
    },
    KeywordRule {
        word: "gerichtsstand",
        context: "Gerichtsstandvereinbarung gefunden.",
    },
    KeywordRule {
        word: "eigentumsvorbehalt",
        context: "Eigentumsvorbehalt bis zur vollständigen Zahlung.",
    },
];

/// Score penalty per distinct critical keyword
pub const CRITICAL_SCORE_DELTA: u32 = 10;

/// Score penalty per distinct warning keyword
pub const WARNING_SCORE_DELTA: u32 = 5;

/// Inputs shorter than this (in characters) are treated as failed extraction
pub const MIN_ANALYZABLE_CHARS: usize = 50;

pub const SUMMARY_CRITICAL: &str =
    "Das Dokument enthält kritische Risiken und sollte dringend juristisch geprüft werden.";

pub const SUMMARY_NEEDS_ATTENTION: &str =
    "Das Dokument enthält einige Punkte, die Aufmerksamkeit erfordern.";

pub const SUMMARY_UNPROBLEMATIC: &str = "Das Dokument scheint unbedenklich.";

pub const SUMMARY_TEXT_TOO_SHORT: &str = "Der extrahierte Text war sehr kurz. Eventuell schlug die OCR fehl oder das Dokument ist leer. Bitte prüfen Sie die Datei.";

/// Returns the rules whose keyword occurs anywhere in `text_lower`
pub fn matching_rules<'a>(
    text_lower: &'a str,
    rules: &'a [KeywordRule],
) -> impl Iterator<Item = (usize, &'a KeywordRule)> + 'a {
    rules
        .iter()
        .enumerate()
        .filter(move |(_, rule)| text_lower.contains(rule.word))
}
