//! Identity verification for report submitters.
//!
//! A [`VerificationSession`] walks a user through email confirmation, two
//! one-time-code checks and, for addresses without an account, password
//! creation. Each call to [`VerificationSession::apply`] takes one input event
//! and either advances the stage and returns the effects to run, or leaves the
//! stage untouched and records field errors.

pub mod challenge;
pub mod login;

pub use challenge::{
    AccountDirectory, Channel, ChallengePolicy, ChallengeService, DemoAccountDirectory,
    LogChallengeService,
};

use crate::validation::{FieldErrors, InputRules};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerificationStage {
    EmailEntry,
    EmailCodeCheck,
    MobileEntry,
    MobileCodeCheck,
    PasswordSetup,
    Authenticated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum VerificationField {
    Email,
    EmailCode,
    Mobile,
    MobileCode,
    Password,
    ConfirmPassword,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationEvent {
    SubmitEmail(String),
    SubmitEmailCode(String),
    SubmitMobile(String),
    SubmitMobileCode(String),
    SubmitPassword {
        password: String,
        confirmation: String,
    },
}

impl VerificationEvent {
    /// Stage in which this event is accepted
    fn stage(&self) -> VerificationStage {
        match self {
            VerificationEvent::SubmitEmail(_) => VerificationStage::EmailEntry,
            VerificationEvent::SubmitEmailCode(_) => VerificationStage::EmailCodeCheck,
            VerificationEvent::SubmitMobile(_) => VerificationStage::MobileEntry,
            VerificationEvent::SubmitMobileCode(_) => VerificationStage::MobileCodeCheck,
            VerificationEvent::SubmitPassword { .. } => VerificationStage::PasswordSetup,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            VerificationEvent::SubmitEmail(_) => "email",
            VerificationEvent::SubmitEmailCode(_) => "email code",
            VerificationEvent::SubmitMobile(_) => "mobile number",
            VerificationEvent::SubmitMobileCode(_) => "mobile code",
            VerificationEvent::SubmitPassword { .. } => "password",
        }
    }
}

/// Identity established by a completed verification or login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub email: String,
    pub mobile: Option<String>,
    pub is_new_account: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationEffect {
    DispatchCode { channel: Channel, address: String },
    Authenticated(AuthenticatedUser),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors<VerificationField>),
    #[error("Invalid {channel} code (attempt {attempts})")]
    ChallengeMismatch { channel: Channel, attempts: u32 },
    #[error("Too many invalid {channel} codes, restart verification")]
    LockedOut { channel: Channel },
    #[error("Cannot submit {event} while in {stage:?}")]
    UnexpectedEvent {
        stage: VerificationStage,
        event: &'static str,
    },
}

/// Collaborators a session consults while applying events
pub struct VerificationContext<'a> {
    pub accounts: &'a dyn AccountDirectory,
    pub policy: &'a ChallengePolicy,
    pub rules: &'a InputRules,
}

#[derive(Debug, Clone)]
pub struct VerificationSession {
    stage: VerificationStage,
    email: Option<String>,
    mobile: Option<String>,
    is_returning_account: Option<bool>,
    field_errors: FieldErrors<VerificationField>,
    failed_attempts: u32,
}

impl Default for VerificationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationSession {
    pub fn new() -> Self {
        Self {
            stage: VerificationStage::EmailEntry,
            email: None,
            mobile: None,
            is_returning_account: None,
            field_errors: FieldErrors::new(),
            failed_attempts: 0,
        }
    }

    pub fn stage(&self) -> VerificationStage {
        self.stage
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn mobile(&self) -> Option<&str> {
        self.mobile.as_deref()
    }

    /// Unset until the email address has been accepted
    pub fn is_returning_account(&self) -> Option<bool> {
        self.is_returning_account
    }

    pub fn field_errors(&self) -> &FieldErrors<VerificationField> {
        &self.field_errors
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    pub fn is_authenticated(&self) -> bool {
        self.stage == VerificationStage::Authenticated
    }

    /// Discard everything collected so far and start over at email entry
    pub fn restart(&mut self) {
        log::debug!("Restarting verification session");
        *self = Self::new();
    }

    /// Apply one submit event. On failure the stage and all accepted values
    /// are left unchanged and the problem is recorded in `field_errors`.
    pub fn apply(
        &mut self,
        event: VerificationEvent,
        ctx: &VerificationContext<'_>,
    ) -> Result<Vec<VerificationEffect>, VerificationError> {
        self.field_errors.clear();

        if event.stage() != self.stage {
            return Err(VerificationError::UnexpectedEvent {
                stage: self.stage,
                event: event.name(),
            });
        }

        let result = match event {
            VerificationEvent::SubmitEmail(email) => self.submit_email(email, ctx),
            VerificationEvent::SubmitEmailCode(code) => {
                self.submit_code(Channel::Email, &code, ctx.policy)
            }
            VerificationEvent::SubmitMobile(mobile) => self.submit_mobile(mobile, ctx.rules),
            VerificationEvent::SubmitMobileCode(code) => {
                self.submit_code(Channel::Mobile, &code, ctx.policy)
            }
            VerificationEvent::SubmitPassword {
                password,
                confirmation,
            } => self.submit_password(&password, &confirmation, ctx.policy),
        };

        match &result {
            Ok(_) => log::debug!("Verification advanced to {:?}", self.stage),
            Err(e) => log::debug!("Verification stayed in {:?}: {e}", self.stage),
        }
        result
    }

    fn reject(&mut self, field: VerificationField, message: &str) -> VerificationError {
        let mut errors = FieldErrors::new();
        errors.insert(field, message);
        self.field_errors = errors.clone();
        VerificationError::Validation(errors)
    }

    fn submit_email(
        &mut self,
        email: String,
        ctx: &VerificationContext<'_>,
    ) -> Result<Vec<VerificationEffect>, VerificationError> {
        if email.is_empty() || !ctx.rules.is_valid_email(&email) {
            return Err(self.reject(
                VerificationField::Email,
                "Please enter a valid email address.",
            ));
        }

        let returning = ctx.accounts.is_known_account(&email);
        log::info!(
            "Email accepted ({} account)",
            if returning { "existing" } else { "new" }
        );

        self.is_returning_account = Some(returning);
        self.email = Some(email.clone());
        self.stage = VerificationStage::EmailCodeCheck;

        Ok(vec![VerificationEffect::DispatchCode {
            channel: Channel::Email,
            address: email,
        }])
    }

    fn submit_mobile(
        &mut self,
        mobile: String,
        rules: &InputRules,
    ) -> Result<Vec<VerificationEffect>, VerificationError> {
        if !rules.is_valid_mobile(&mobile) {
            return Err(self.reject(
                VerificationField::Mobile,
                "Please enter a valid 10-digit mobile number.",
            ));
        }

        self.mobile = Some(mobile.clone());
        self.stage = VerificationStage::MobileCodeCheck;

        Ok(vec![VerificationEffect::DispatchCode {
            channel: Channel::Mobile,
            address: mobile,
        }])
    }

    fn submit_code(
        &mut self,
        channel: Channel,
        code: &str,
        policy: &ChallengePolicy,
    ) -> Result<Vec<VerificationEffect>, VerificationError> {
        let field = match channel {
            Channel::Email => VerificationField::EmailCode,
            Channel::Mobile => VerificationField::MobileCode,
        };

        if let Some(max) = policy.max_attempts {
            if self.failed_attempts >= max {
                self.field_errors
                    .insert(field, "Too many invalid attempts. Please start again.");
                return Err(VerificationError::LockedOut { channel });
            }
        }

        if code != policy.expected_code(channel) {
            self.failed_attempts += 1;
            log::warn!(
                "Invalid {channel} code submitted ({} failed attempts)",
                self.failed_attempts
            );
            let message = match channel {
                Channel::Email => "Invalid email OTP.",
                Channel::Mobile => "Invalid mobile OTP.",
            };
            self.field_errors.insert(field, message);

            if policy
                .max_attempts
                .is_some_and(|max| self.failed_attempts >= max)
            {
                return Err(VerificationError::LockedOut { channel });
            }
            return Err(VerificationError::ChallengeMismatch {
                channel,
                attempts: self.failed_attempts,
            });
        }

        self.failed_attempts = 0;
        match channel {
            Channel::Email => {
                self.stage = VerificationStage::MobileEntry;
                Ok(Vec::new())
            }
            Channel::Mobile => {
                if self.is_returning_account == Some(true) {
                    log::info!("Existing account verified");
                    self.stage = VerificationStage::Authenticated;
                    Ok(vec![VerificationEffect::Authenticated(
                        self.authenticated_user(false),
                    )])
                } else {
                    log::info!("New account verified, password setup required");
                    self.stage = VerificationStage::PasswordSetup;
                    Ok(Vec::new())
                }
            }
        }
    }

    fn submit_password(
        &mut self,
        password: &str,
        confirmation: &str,
        policy: &ChallengePolicy,
    ) -> Result<Vec<VerificationEffect>, VerificationError> {
        let mut errors = FieldErrors::new();
        if password.chars().count() < policy.min_password_length {
            errors.insert(
                VerificationField::Password,
                format!(
                    "Password must be at least {} characters long.",
                    policy.min_password_length
                ),
            );
        }
        if password != confirmation {
            errors.insert(
                VerificationField::ConfirmPassword,
                "Passwords do not match.",
            );
        }

        if let Err(errors) = errors.into_result() {
            self.field_errors = errors.clone();
            return Err(VerificationError::Validation(errors));
        }

        log::info!("Password set, new account registration complete");
        self.stage = VerificationStage::Authenticated;
        Ok(vec![VerificationEffect::Authenticated(
            self.authenticated_user(true),
        )])
    }

    fn authenticated_user(&self, is_new_account: bool) -> AuthenticatedUser {
        AuthenticatedUser {
            email: self.email.clone().unwrap_or_default(),
            mobile: self.mobile.clone(),
            is_new_account,
        }
    }
}
