pub mod analysis;
pub mod config;
pub mod confirmation;
pub mod draft;
pub mod flow;
pub mod submission;
pub mod taxonomy;
pub mod validation;
pub mod verification;

pub use analysis::{AnalysisError, AnalysisSuggestion, ImageAnalyzer};
pub use config::Config;
pub use draft::{DraftEdit, ImageAttachment, ReportDraft};
pub use flow::{FlowError, FlowServices, ReportFlow, StageKind};
pub use submission::{ReportId, ReportSubmitter, SubmissionError};
pub use taxonomy::{Category, City, ReportKind};
pub use verification::{VerificationEvent, VerificationSession, VerificationStage};
