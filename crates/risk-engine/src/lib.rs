pub mod patterns;
pub mod rules;

use patterns::{
    MIN_ANALYZABLE_CHARS, SUMMARY_CRITICAL, SUMMARY_NEEDS_ATTENTION, SUMMARY_TEXT_TOO_SHORT,
    SUMMARY_UNPROBLEMATIC,
};
use shared_types::{AnalysisResult, RiskBand, RiskFinding};
use tracing::debug;

const MAX_SCORE: u32 = 100;

/// RiskEngine entry point
pub struct RiskEngine;

impl RiskEngine {
    pub fn new() -> Self {
        Self
    }

    /// Score a contract text. Pure and total: never fails, whatever the input.
    pub fn analyze(&self, text: &str) -> AnalysisResult {
        if text.chars().count() < MIN_ANALYZABLE_CHARS {
            debug!(chars = text.chars().count(), "text below analyzable length");
            return AnalysisResult {
                summary: SUMMARY_TEXT_TOO_SHORT.to_string(),
                score: 0,
                band: RiskBand::ExtractionFailed,
                findings: Vec::new(),
            };
        }

        let findings = self.check_text(text);
        let score = score_for(&findings);
        let band = band_for(score);

        debug!(score, findings = findings.len(), "analysis complete");

        AnalysisResult {
            summary: summary_for(band).to_string(),
            score,
            band,
            findings,
        }
    }

    /// Run every rule without the short-text override (for testing)
    pub fn check_text(&self, text: &str) -> Vec<RiskFinding> {
        let text_lower = text.to_lowercase();
        let mut findings = Vec::new();
        findings.extend(rules::keywords::check_critical_keywords(&text_lower));
        findings.extend(rules::keywords::check_warning_keywords(&text_lower));
        findings
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// `100 - Σ score_delta`, floored at 0
pub fn score_for(findings: &[RiskFinding]) -> u32 {
    let penalty: u32 = findings.iter().map(|f| f.score_delta).sum();
    MAX_SCORE.saturating_sub(penalty)
}

pub fn band_for(score: u32) -> RiskBand {
    if score < 50 {
        RiskBand::Critical
    } else if score < 80 {
        RiskBand::NeedsAttention
    } else {
        RiskBand::Unproblematic
    }
}

pub fn summary_for(band: RiskBand) -> &'static str {
    match band {
        RiskBand::Critical => SUMMARY_CRITICAL,
        RiskBand::NeedsAttention => SUMMARY_NEEDS_ATTENTION,
        RiskBand::Unproblematic => SUMMARY_UNPROBLEMATIC,
        RiskBand::ExtractionFailed => SUMMARY_TEXT_TOO_SHORT,
    }
}
