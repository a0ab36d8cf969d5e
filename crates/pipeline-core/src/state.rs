//! Pipeline state machine

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Scanning,
    Anonymizing,
    Analyzing,
    Complete,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Failed)
    }

    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, Scanning) | (Scanning, Anonymizing) | (Anonymizing, Analyzing) => true,
            (Analyzing, Complete) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Checked transition
    pub fn transition(self, next: PipelineState) -> Result<PipelineState, PipelineError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(PipelineError::internal(format!(
                "illegal pipeline transition {:?} -> {:?}",
                self, next
            )))
        }
    }
}
