use crate::patterns::{
    matching_rules, KeywordRule, CRITICAL_KEYWORDS, CRITICAL_SCORE_DELTA, WARNING_KEYWORDS,
    WARNING_SCORE_DELTA,
};
use shared_types::{RiskCategory, RiskFinding};

/// One finding per distinct critical keyword present in `text_lower`
pub fn check_critical_keywords(text_lower: &str) -> Vec<RiskFinding> {
    check_dictionary(
        text_lower,
        CRITICAL_KEYWORDS,
        RiskCategory::Critical,
        CRITICAL_SCORE_DELTA,
        "crit",
    )
}

/// One finding per distinct warning keyword present in `text_lower`
pub fn check_warning_keywords(text_lower: &str) -> Vec<RiskFinding> {
    check_dictionary(
        text_lower,
        WARNING_KEYWORDS,
        RiskCategory::Warning,
        WARNING_SCORE_DELTA,
        "warn",
    )
}

fn check_dictionary(
    text_lower: &str,
    rules: &[KeywordRule],
    category: RiskCategory,
    score_delta: u32,
    id_prefix: &str,
) -> Vec<RiskFinding> {
    matching_rules(text_lower, rules)
        .map(|(index, rule)| RiskFinding {
            id: format!("{}-{}", id_prefix, index),
            category,
            matched_term: rule.word.to_uppercase(),
            explanation: rule.context.to_string(),
            score_delta,
        })
        .collect()
}
