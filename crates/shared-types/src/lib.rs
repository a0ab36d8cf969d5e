pub mod account;
pub mod document;
pub mod record;
pub mod redaction;
pub mod types;

pub use account::TokenBalance;
pub use document::{DocumentUpload, ExtractionMethod, ExtractionResult, PageRecord};
pub use record::{AnalysisRecord, FailureInfo, FailureKind, RecordStatus};
pub use redaction::{PiiKind, RedactedSpan, RedactionResult};
pub use types::{AnalysisResult, RiskBand, RiskCategory, RiskFinding};
