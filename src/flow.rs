//! The report workflow from identity check to submitted report.
//!
//! [`ReportFlow`] owns the current [`FlowStage`] and moves through
//! `Authenticate -> Instructions -> FormEntry -> Confirm -> Success`, with a
//! back edge from `Confirm` to `FormEntry` and `Success -> Instructions` for
//! filing another report. Every operation checks that it is valid for the
//! current stage and leaves the stage untouched when it fails.
//!
//! Image analysis can run in two halves ([`ReportFlow::begin_analysis`] and
//! [`ReportFlow::complete_analysis`]) so a caller may keep the flow
//! interactive while the request is outstanding. Results that arrive after
//! the user has moved on, or changed the image, are dropped.

use crate::analysis::{analyzer_from_config, AnalysisError, AnalysisSuggestion, ImageAnalyzer};
use crate::config::Config;
use crate::confirmation::{Confirmation, SubmittedReport};
use crate::draft::{DraftEdit, DraftError, DraftField, ReportDraft};
use crate::submission::{submitter_from_config, ReportSubmitter, SubmissionError};
use crate::validation::{FieldErrors, InputRules};
use crate::verification::{
    AccountDirectory, AuthenticatedUser, ChallengePolicy, ChallengeService, Channel,
    DemoAccountDirectory, LogChallengeService, VerificationContext, VerificationEffect,
    VerificationError, VerificationEvent, VerificationField, VerificationSession,
};
use anyhow::Context;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub const INSTRUCTIONS: [&str; 7] = [
    "Choose the relevant category, subcategory, and type.",
    "Give a clear description with additional details of the lost/found thing.",
    "Enter the exact location of where you lost/found the item.",
    "If applicable, mention the serial number, document number, etc.",
    "Add extra reward, if you want to give a reward to the found reporter.",
    "Choose the right city.",
    "Use keywords (Tags) properly and upload a clear image for better visibility.",
];

pub const NOTES_BEFORE_REPORTING: [&str; 4] = [
    "This application is for providing service to the Lost and Found. The information may be shared with the Police.",
    "Information reported under this application is not a subject matter of enquiry/investigation.",
    "A false report is a punishable offence. The reporting person shall be solely responsible for any false information.",
    "Dial 112 or 100 if there is any emergency.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StageKind {
    Authenticate,
    Instructions,
    FormEntry,
    Confirm,
    Success,
}

/// Field errors from whichever stage rejected the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrors {
    Verification(FieldErrors<VerificationField>),
    Draft(FieldErrors<DraftField>),
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationErrors::Verification(errors) => fmt::Display::fmt(errors, f),
            ValidationErrors::Draft(errors) => fmt::Display::fmt(errors, f),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("Invalid {channel} code (attempt {attempts})")]
    ChallengeMismatch { channel: Channel, attempts: u32 },
    #[error("Too many invalid {channel} codes, restart verification")]
    LockedOut { channel: Channel },
    #[error("Image analysis failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Submission failed: {0}")]
    Submission(#[from] SubmissionError),
    #[error("Cannot {action} while in {stage:?}")]
    WrongStage {
        stage: StageKind,
        action: &'static str,
    },
    #[error("Image analysis is already running")]
    AnalysisInProgress,
    #[error("The instructions and notes must be acknowledged first")]
    NotAcknowledged,
}

impl From<VerificationError> for FlowError {
    fn from(e: VerificationError) -> Self {
        match e {
            VerificationError::Validation(errors) => {
                FlowError::Validation(ValidationErrors::Verification(errors))
            }
            VerificationError::ChallengeMismatch { channel, attempts } => {
                FlowError::ChallengeMismatch { channel, attempts }
            }
            VerificationError::LockedOut { channel } => FlowError::LockedOut { channel },
            VerificationError::UnexpectedEvent { event, .. } => FlowError::WrongStage {
                stage: StageKind::Authenticate,
                action: event,
            },
        }
    }
}

impl From<DraftError> for FlowError {
    fn from(e: DraftError) -> Self {
        match e {
            DraftError::Validation(errors) => FlowError::Validation(ValidationErrors::Draft(errors)),
        }
    }
}

/// External collaborators the flow calls into
#[derive(Clone)]
pub struct FlowServices {
    pub challenges: Arc<dyn ChallengeService>,
    pub accounts: Arc<dyn AccountDirectory>,
    pub analyzer: Arc<dyn ImageAnalyzer>,
    pub submitter: Arc<dyn ReportSubmitter>,
    pub policy: ChallengePolicy,
    pub rules: InputRules,
}

impl FlowServices {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            challenges: Arc::new(LogChallengeService),
            accounts: Arc::new(DemoAccountDirectory::from_config(&config.verification)),
            analyzer: analyzer_from_config(&config.analysis),
            submitter: submitter_from_config(&config.submission)
                .context("Failed to set up report submission")?,
            policy: ChallengePolicy::from_config(&config.verification),
            rules: InputRules::new().context("Failed to compile input patterns")?,
        })
    }
}

impl fmt::Debug for FlowServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowServices")
            .field("analyzer", &self.analyzer.name())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Handle identifying one analysis request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisTicket(u64);

/// Everything needed to run an analysis outside the flow
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub ticket: AnalysisTicket,
    pub image: Vec<u8>,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisStatus {
    Idle,
    Running(AnalysisTicket),
    Succeeded,
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Merged,
    /// The flow or the image moved on while the request was out
    Discarded,
}

/// Form stage state: the editable draft plus analysis bookkeeping
#[derive(Debug, Clone)]
pub struct FormSession {
    draft: ReportDraft,
    analysis: AnalysisStatus,
    field_errors: FieldErrors<DraftField>,
}

impl FormSession {
    fn new(draft: ReportDraft) -> Self {
        Self {
            draft,
            analysis: AnalysisStatus::Idle,
            field_errors: FieldErrors::new(),
        }
    }

    pub fn draft(&self) -> &ReportDraft {
        &self.draft
    }

    pub fn analysis_status(&self) -> &AnalysisStatus {
        &self.analysis
    }

    pub fn analysis_succeeded(&self) -> bool {
        self.analysis == AnalysisStatus::Succeeded
    }

    pub fn is_analyzing(&self) -> bool {
        matches!(self.analysis, AnalysisStatus::Running(_))
    }

    pub fn field_errors(&self) -> &FieldErrors<DraftField> {
        &self.field_errors
    }

    fn edit(&mut self, edit: DraftEdit) -> Result<(), DraftError> {
        let field = edit.field();
        let touches_image = field == DraftField::Image;
        self.draft.apply_edit(edit)?;
        self.field_errors.remove(&field);

        if touches_image {
            if let AnalysisStatus::Running(ticket) = self.analysis {
                log::debug!("Image changed, result of analysis {ticket:?} will be ignored");
            }
            self.analysis = AnalysisStatus::Idle;
        } else if !self.is_analyzing() {
            self.analysis = AnalysisStatus::Idle;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum FlowStage {
    Authenticate(VerificationSession),
    Instructions,
    FormEntry(FormSession),
    Confirm(Confirmation),
    Success(SubmittedReport),
}

impl FlowStage {
    pub fn kind(&self) -> StageKind {
        match self {
            FlowStage::Authenticate(_) => StageKind::Authenticate,
            FlowStage::Instructions => StageKind::Instructions,
            FlowStage::FormEntry(_) => StageKind::FormEntry,
            FlowStage::Confirm(_) => StageKind::Confirm,
            FlowStage::Success(_) => StageKind::Success,
        }
    }
}

#[derive(Debug)]
pub struct ReportFlow {
    services: FlowServices,
    stage: FlowStage,
    user: Option<AuthenticatedUser>,
    next_ticket: u64,
}

impl ReportFlow {
    /// Start a flow. An authenticated caller skips identity verification.
    pub fn new(services: FlowServices, is_authenticated: bool) -> Self {
        let stage = if is_authenticated {
            FlowStage::Instructions
        } else {
            FlowStage::Authenticate(VerificationSession::new())
        };
        log::info!("Report flow started in {:?}", stage.kind());
        Self {
            services,
            stage,
            user: None,
            next_ticket: 0,
        }
    }

    /// Start a flow for a user who already signed in
    pub fn with_user(services: FlowServices, user: AuthenticatedUser) -> Self {
        let mut flow = Self::new(services, true);
        flow.user = Some(user);
        flow
    }

    pub fn stage(&self) -> &FlowStage {
        &self.stage
    }

    pub fn stage_kind(&self) -> StageKind {
        self.stage.kind()
    }

    pub fn user(&self) -> Option<&AuthenticatedUser> {
        self.user.as_ref()
    }

    pub fn verification(&self) -> Option<&VerificationSession> {
        match &self.stage {
            FlowStage::Authenticate(session) => Some(session),
            _ => None,
        }
    }

    pub fn form(&self) -> Option<&FormSession> {
        match &self.stage {
            FlowStage::FormEntry(form) => Some(form),
            _ => None,
        }
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        match &self.stage {
            FlowStage::Confirm(confirmation) => Some(confirmation),
            _ => None,
        }
    }

    pub fn submitted(&self) -> Option<&SubmittedReport> {
        match &self.stage {
            FlowStage::Success(report) => Some(report),
            _ => None,
        }
    }

    /// Draft of the current report, if the flow has one
    pub fn draft(&self) -> Option<&ReportDraft> {
        match &self.stage {
            FlowStage::FormEntry(form) => Some(form.draft()),
            FlowStage::Confirm(confirmation) => Some(confirmation.draft()),
            FlowStage::Success(report) => Some(report.draft()),
            FlowStage::Authenticate(_) | FlowStage::Instructions => None,
        }
    }

    fn wrong_stage(&self, action: &'static str) -> FlowError {
        FlowError::WrongStage {
            stage: self.stage.kind(),
            action,
        }
    }

    fn enter(&mut self, stage: FlowStage) {
        log::info!("Report flow: {:?} -> {:?}", self.stage.kind(), stage.kind());
        self.stage = stage;
    }

    /// Feed one event to the identity verification stage
    pub fn verify(&mut self, event: VerificationEvent) -> Result<StageKind, FlowError> {
        let FlowStage::Authenticate(session) = &mut self.stage else {
            return Err(self.wrong_stage("verify identity"));
        };

        let ctx = VerificationContext {
            accounts: &*self.services.accounts,
            policy: &self.services.policy,
            rules: &self.services.rules,
        };
        let effects = session.apply(event, &ctx)?;

        let mut authenticated = None;
        for effect in effects {
            match effect {
                VerificationEffect::DispatchCode { channel, address } => {
                    self.services.challenges.dispatch_code(channel, &address);
                }
                VerificationEffect::Authenticated(user) => authenticated = Some(user),
            }
        }

        if let Some(user) = authenticated {
            log::info!("Reporter authenticated");
            self.user = Some(user);
            self.enter(FlowStage::Instructions);
        }
        Ok(self.stage.kind())
    }

    /// Start verification over from email entry
    pub fn restart_verification(&mut self) -> Result<(), FlowError> {
        match &mut self.stage {
            FlowStage::Authenticate(session) => {
                session.restart();
                Ok(())
            }
            _ => Err(self.wrong_stage("restart verification")),
        }
    }

    /// Leave the instructions only once the user affirms having read them
    pub fn acknowledge_instructions(&mut self, affirmed: bool) -> Result<(), FlowError> {
        if !matches!(self.stage, FlowStage::Instructions) {
            return Err(self.wrong_stage("acknowledge instructions"));
        }
        if !affirmed {
            return Err(FlowError::NotAcknowledged);
        }
        self.enter(FlowStage::FormEntry(FormSession::new(ReportDraft::default())));
        Ok(())
    }

    pub fn edit(&mut self, edit: DraftEdit) -> Result<(), FlowError> {
        match &mut self.stage {
            FlowStage::FormEntry(form) => Ok(form.edit(edit)?),
            _ => Err(self.wrong_stage("edit the report")),
        }
    }

    /// Mark an analysis as running and hand back what the analyzer needs.
    /// Only one analysis may be outstanding at a time.
    pub fn begin_analysis(&mut self) -> Result<AnalysisRequest, FlowError> {
        let FlowStage::FormEntry(form) = &mut self.stage else {
            return Err(self.wrong_stage("analyze the image"));
        };
        if form.is_analyzing() {
            return Err(FlowError::AnalysisInProgress);
        }
        let Some(image) = form.draft.image() else {
            let mut errors = FieldErrors::new();
            errors.insert(DraftField::Image, "Please upload an image first.");
            return Err(FlowError::Validation(ValidationErrors::Draft(errors)));
        };

        self.next_ticket += 1;
        let ticket = AnalysisTicket(self.next_ticket);
        let request = AnalysisRequest {
            ticket,
            image: image.bytes().to_vec(),
            mime_type: image.mime_type().to_string(),
        };
        form.analysis = AnalysisStatus::Running(ticket);
        log::debug!("Analysis {ticket:?} started");
        Ok(request)
    }

    /// Apply the result of an analysis started with [`Self::begin_analysis`].
    /// A successful suggestion is merged into the draft as it is now.
    pub fn complete_analysis(
        &mut self,
        ticket: AnalysisTicket,
        result: Result<AnalysisSuggestion, AnalysisError>,
    ) -> Result<AnalysisOutcome, FlowError> {
        let form = match &mut self.stage {
            FlowStage::FormEntry(form) if form.analysis == AnalysisStatus::Running(ticket) => form,
            _ => {
                log::info!("Discarding result of analysis {ticket:?}, no longer wanted");
                return Ok(AnalysisOutcome::Discarded);
            }
        };

        match result {
            Ok(suggestion) => {
                form.draft.merge_suggestion(&suggestion);
                form.analysis = AnalysisStatus::Succeeded;
                log::info!("Analysis {ticket:?} merged into draft");
                Ok(AnalysisOutcome::Merged)
            }
            Err(e) => {
                log::warn!("Analysis {ticket:?} failed: {e}");
                form.analysis = AnalysisStatus::Failed(e.user_message().to_string());
                Err(FlowError::Analysis(e))
            }
        }
    }

    /// Run the configured analyzer on the attached image and merge the result
    pub async fn analyze_image(&mut self) -> Result<AnalysisOutcome, FlowError> {
        let request = self.begin_analysis()?;
        let analyzer = Arc::clone(&self.services.analyzer);
        log::info!("Analyzing image with {} analyzer", analyzer.name());
        let result = analyzer.analyze(&request.image, &request.mime_type).await;
        self.complete_analysis(request.ticket, result)
    }

    /// Validate the form and move its draft, unchanged, to confirmation
    pub fn submit_form(&mut self) -> Result<(), FlowError> {
        let FlowStage::FormEntry(form) = &mut self.stage else {
            return Err(self.wrong_stage("submit the form"));
        };
        if let Err(e) = form.draft.validate() {
            form.field_errors = e.field_errors().clone();
            log::debug!("Form incomplete: {e}");
            return Err(e.into());
        }

        let draft = form.draft.clone();
        self.enter(FlowStage::Confirm(Confirmation::new(draft)));
        Ok(())
    }

    /// Return from confirmation to the form with the draft as it was
    pub fn back_to_form(&mut self) -> Result<(), FlowError> {
        let FlowStage::Confirm(confirmation) = &self.stage else {
            return Err(self.wrong_stage("go back to the form"));
        };
        let draft = confirmation.draft().clone();
        self.enter(FlowStage::FormEntry(FormSession::new(draft)));
        Ok(())
    }

    /// Submit the confirmed draft. On failure the flow stays in `Confirm`
    /// and the submission may be retried.
    pub async fn confirm(&mut self) -> Result<&SubmittedReport, FlowError> {
        let submitter = Arc::clone(&self.services.submitter);
        let FlowStage::Confirm(confirmation) = &mut self.stage else {
            return Err(self.wrong_stage("submit the report"));
        };

        match submitter.submit(confirmation.draft()).await {
            Ok(id) => {
                confirmation.record_attempt(Ok(()));
                log::info!("Report submitted as {id}");
                let report = SubmittedReport::new(id, confirmation.draft().clone());
                self.enter(FlowStage::Success(report));
            }
            Err(e) => {
                log::warn!("Report submission failed: {e}");
                confirmation.record_attempt(Err(e.clone()));
                return Err(FlowError::Submission(e));
            }
        }

        match &self.stage {
            FlowStage::Success(report) => Ok(report),
            _ => Err(self.wrong_stage("submit the report")),
        }
    }

    /// Drop the submitted report and start a new one, staying signed in
    pub fn file_another(&mut self) -> Result<(), FlowError> {
        if !matches!(self.stage, FlowStage::Success(_)) {
            return Err(self.wrong_stage("file another report"));
        }
        self.enter(FlowStage::Instructions);
        Ok(())
    }
}
