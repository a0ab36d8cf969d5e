#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RiskFinding {
    pub id: String, // e.g., "crit-1"
    pub category: RiskCategory,
    pub matched_term: String,
    pub explanation: String,
    pub score_delta: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub score: u32, // 0..=100
    pub band: RiskBand,
    pub findings: Vec<RiskFinding>,
}

impl AnalysisResult {
    pub fn critical_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.category == RiskCategory::Critical)
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Critical,
    Warning,
    /// Reserved for future rule types
    Info,
}

/// Score band the summary text was chosen from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    Critical,
    NeedsAttention,
    Unproblematic,
    /// Input too short to analyze; score forced to 0
    ExtractionFailed,
}
