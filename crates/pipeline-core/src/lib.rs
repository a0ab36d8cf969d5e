//! Document analysis pipeline
//!
//! Drives one upload through `Idle → Scanning → Anonymizing → Analyzing →
//! Complete`, debiting the caller's tokens before each paid stage:
//!
//! | Stage       | Cost | Work                                  |
//! |-------------|------|---------------------------------------|
//! | Scanning    | 1    | text extraction (embedded text / OCR) |
//! | Anonymizing | -    | PII redaction for display             |
//! | Analyzing   | 3    | risk analysis of the extracted text   |
//!
//! Any failure after the first debit moves the run to `Failed` and records
//! it in the user's history with the tokens actually spent. Debits are not
//! rolled back.

pub mod error;
pub mod history;
pub mod state;

use std::sync::Arc;

use extraction_engine::ExtractionService;
use redaction_engine::Redactor;
use risk_engine::RiskEngine;
use serde::{Deserialize, Serialize};
use shared_types::{
    AnalysisRecord, AnalysisResult, DocumentUpload, ExtractionResult, FailureKind,
    RedactionResult, TokenBalance,
};
use token_ledger::TokenLedger;
use tracing::{info, warn};

pub use error::PipelineError;
pub use history::{
    HistoryConfig, HistoryError, HistoryStore, JsonFileHistoryStore, MemoryHistoryStore,
};
pub use state::PipelineState;

/// Tokens debited before extraction
pub const SCAN_COST: u32 = 1;
/// Tokens debited before analysis
pub const ANALYSIS_COST: u32 = 3;
/// Full cost of a successful run
pub const RUN_COST: u32 = SCAN_COST + ANALYSIS_COST;

/// `[pipeline]` section of the server config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Refuse to start unless the balance covers `RUN_COST`
    #[serde(default)]
    pub preflight_check: bool,
}

/// Receives every state transition of a run
pub trait ProgressObserver: Send + Sync {
    fn on_transition(&self, from: PipelineState, to: PipelineState);
}

impl<F> ProgressObserver for F
where
    F: Fn(PipelineState, PipelineState) + Send + Sync,
{
    fn on_transition(&self, from: PipelineState, to: PipelineState) {
        self(from, to)
    }
}

pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn on_transition(&self, _from: PipelineState, _to: PipelineState) {}
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub record_id: String,
    pub extracted_text: String,
    pub extraction: ExtractionResult,
    pub redaction: RedactionResult,
    pub analysis: AnalysisResult,
    /// Balance after the last debit
    pub balance: TokenBalance,
}

struct Run<'a> {
    user_id: &'a str,
    file_name: String,
    state: PipelineState,
    tokens_used: u32,
    observer: &'a dyn ProgressObserver,
}

impl Run<'_> {
    fn advance(&mut self, next: PipelineState) -> Result<(), PipelineError> {
        let from = self.state;
        self.state = from.transition(next)?;
        info!(user = self.user_id, file = %self.file_name, ?from, to = ?next, "pipeline transition");
        self.observer.on_transition(from, next);
        Ok(())
    }
}

pub struct DocumentPipeline {
    extraction: Arc<ExtractionService>,
    redactor: Arc<Redactor>,
    risk: Arc<RiskEngine>,
    ledger: Arc<TokenLedger>,
    history: Arc<dyn HistoryStore>,
    config: PipelineConfig,
}

impl DocumentPipeline {
    pub fn new(
        extraction: ExtractionService,
        redactor: Redactor,
        risk: RiskEngine,
        ledger: Arc<TokenLedger>,
        history: Arc<dyn HistoryStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            extraction: Arc::new(extraction),
            redactor: Arc::new(redactor),
            risk: Arc::new(risk),
            ledger,
            history,
            config,
        }
    }

    pub fn ledger(&self) -> &Arc<TokenLedger> {
        &self.ledger
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Run the full pipeline for one upload.
    ///
    /// When the first debit is refused the run never leaves `Idle`: nothing
    /// is extracted and nothing is recorded.
    pub async fn analyze_document(
        &self,
        upload: DocumentUpload,
        user_id: &str,
        observer: &dyn ProgressObserver,
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut run = Run {
            user_id,
            file_name: upload.file_name.clone(),
            state: PipelineState::Idle,
            tokens_used: 0,
            observer,
        };

        if self.config.preflight_check {
            let account = self.ledger.balance(user_id).await?;
            if !account.can_afford(RUN_COST) {
                info!(user = user_id, balance = account.balance, "preflight refused");
                return Err(PipelineError::new(
                    FailureKind::InsufficientTokens,
                    format!(
                        "Insufficient tokens: {} required, {} available",
                        RUN_COST, account.balance
                    ),
                ));
            }
        }

        self.ledger.debit(user_id, SCAN_COST).await?;
        run.tokens_used = SCAN_COST;
        run.advance(PipelineState::Scanning)?;

        // Scanning
        let extraction = {
            let service = self.extraction.clone();
            match tokio::spawn(async move { service.extract(&upload).await }).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => return Err(self.fail(&mut run, None, e.into()).await),
                Err(e) => {
                    return Err(self.fail(&mut run, None, PipelineError::internal(e)).await)
                }
            }
        };
        run.advance(PipelineState::Anonymizing)?;

        // Anonymizing
        let redaction = {
            let redactor = self.redactor.clone();
            let text = extraction.extracted_text.clone();
            match tokio::task::spawn_blocking(move || redactor.redact(&text)).await {
                Ok(result) => result,
                Err(e) => {
                    let err = PipelineError::internal(e);
                    return Err(self.fail(&mut run, Some(extraction), err).await);
                }
            }
        };

        let balance = match self.ledger.debit(user_id, ANALYSIS_COST).await {
            Ok(balance) => balance,
            Err(e) => return Err(self.fail(&mut run, Some(extraction), e.into()).await),
        };
        run.tokens_used += ANALYSIS_COST;
        run.advance(PipelineState::Analyzing)?;

        // Analyzing: scored on the extracted text, not the redacted one
        let analysis = {
            let risk = self.risk.clone();
            let text = extraction.extracted_text.clone();
            match tokio::task::spawn_blocking(move || risk.analyze(&text)).await {
                Ok(result) => result,
                Err(e) => {
                    let err = PipelineError::internal(e);
                    return Err(self.fail(&mut run, Some(extraction), err).await);
                }
            }
        };

        let record = AnalysisRecord::completed(
            user_id,
            &run.file_name,
            run.tokens_used,
            extraction.clone(),
            analysis.clone(),
        );
        let record_id = record.id.clone();
        if let Err(e) = self.history.append(record).await {
            return Err(self.fail(&mut run, Some(extraction), e.into()).await);
        }
        run.advance(PipelineState::Complete)?;

        info!(
            user = user_id,
            record = %record_id,
            score = analysis.score,
            findings = analysis.findings.len(),
            redactions = redaction.spans.len(),
            "analysis complete"
        );

        Ok(PipelineOutcome {
            record_id,
            extracted_text: extraction.extracted_text.clone(),
            extraction,
            redaction,
            analysis,
            balance,
        })
    }

    /// Move to `Failed` and record the run. Returns `err` for the caller.
    async fn fail(
        &self,
        run: &mut Run<'_>,
        extraction: Option<ExtractionResult>,
        err: PipelineError,
    ) -> PipelineError {
        if let Err(e) = run.advance(PipelineState::Failed) {
            warn!(error = %e, "could not mark run failed");
        }

        warn!(
            user = run.user_id,
            file = %run.file_name,
            kind = ?err.kind,
            tokens_used = run.tokens_used,
            "pipeline failed"
        );

        let record = AnalysisRecord::failed(
            run.user_id,
            &run.file_name,
            run.tokens_used,
            extraction,
            err.to_failure_info(),
        );
        if let Err(e) = self.history.append(record).await {
            warn!(error = %e, "failed run not recorded");
        }
        err
    }
}
