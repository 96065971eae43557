//! Stand-alone sign-in and registration with a single email code check.

use super::{AccountDirectory, AuthenticatedUser, Channel, ChallengePolicy, ChallengeService};
use crate::validation::InputRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    SignIn,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Credentials,
    CodeCheck,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    #[error("Please fill in all fields.")]
    MissingFields,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Password must be at least {0} characters long.")]
    PasswordTooShort(usize),
    #[error("Invalid credentials.")]
    InvalidCredentials,
    #[error("Invalid OTP.")]
    InvalidCode,
    #[error("Cannot {action} while in {stage:?}")]
    WrongStage {
        stage: LoginStage,
        action: &'static str,
    },
}

#[derive(Debug)]
pub struct LoginSession {
    mode: LoginMode,
    stage: LoginStage,
    email: Option<String>,
    error: Option<LoginError>,
}

impl LoginSession {
    pub fn new(mode: LoginMode) -> Self {
        Self {
            mode,
            stage: LoginStage::Credentials,
            email: None,
            error: None,
        }
    }

    pub fn mode(&self) -> LoginMode {
        self.mode
    }

    pub fn stage(&self) -> LoginStage {
        self.stage
    }

    /// Last error shown to the user, cleared on every submit
    pub fn error(&self) -> Option<&LoginError> {
        self.error.as_ref()
    }

    pub fn submit_credentials(
        &mut self,
        email: &str,
        password: &str,
        accounts: &dyn AccountDirectory,
        rules: &InputRules,
        policy: &ChallengePolicy,
        challenges: &dyn ChallengeService,
    ) -> Result<(), LoginError> {
        self.error = None;
        self.expect_stage(LoginStage::Credentials, "submit credentials")?;

        let result = match self.mode {
            _ if email.is_empty() || password.is_empty() => Err(LoginError::MissingFields),
            LoginMode::SignIn if !accounts.verify_password(email, password) => {
                Err(LoginError::InvalidCredentials)
            }
            LoginMode::Register if !rules.is_valid_email(email) => Err(LoginError::InvalidEmail),
            LoginMode::Register if password.chars().count() < policy.min_password_length => {
                Err(LoginError::PasswordTooShort(policy.min_password_length))
            }
            _ => Ok(()),
        };
        self.record(result)?;

        challenges.dispatch_code(Channel::Email, email);
        self.email = Some(email.to_string());
        self.stage = LoginStage::CodeCheck;
        log::debug!("Login credentials accepted ({:?})", self.mode);
        Ok(())
    }

    pub fn submit_code(
        &mut self,
        code: &str,
        policy: &ChallengePolicy,
    ) -> Result<AuthenticatedUser, LoginError> {
        self.error = None;
        self.expect_stage(LoginStage::CodeCheck, "submit a code")?;

        if code != policy.expected_code(Channel::Email) {
            log::warn!("Invalid login code submitted");
            self.error = Some(LoginError::InvalidCode);
            return Err(LoginError::InvalidCode);
        }

        self.stage = LoginStage::Complete;
        let is_new_account = self.mode == LoginMode::Register;
        log::info!(
            "{} successful",
            if is_new_account { "Registration" } else { "Login" }
        );
        Ok(AuthenticatedUser {
            email: self.email.clone().unwrap_or_default(),
            mobile: None,
            is_new_account,
        })
    }

    /// Return from the code check to credential entry
    pub fn back(&mut self) -> Result<(), LoginError> {
        self.expect_stage(LoginStage::CodeCheck, "go back")?;
        self.error = None;
        self.email = None;
        self.stage = LoginStage::Credentials;
        Ok(())
    }

    fn expect_stage(&self, stage: LoginStage, action: &'static str) -> Result<(), LoginError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(LoginError::WrongStage {
                stage: self.stage,
                action,
            })
        }
    }

    fn record(&mut self, result: Result<(), LoginError>) -> Result<(), LoginError> {
        if let Err(e) = &result {
            self.error = Some(e.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DemoAccount;
    use crate::verification::DemoAccountDirectory;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingChallenges {
        sent: Mutex<Vec<(Channel, String)>>,
    }

    impl ChallengeService for RecordingChallenges {
        fn dispatch_code(&self, channel: Channel, address: &str) {
            self.sent.lock().unwrap().push((channel, address.to_string()));
        }
    }

    fn accounts() -> DemoAccountDirectory {
        DemoAccountDirectory::new(vec![DemoAccount {
            email: "user@demo.com".to_string(),
            password: "password123".to_string(),
        }])
    }

    #[test]
    fn test_sign_in_with_demo_credentials() {
        let accounts = accounts();
        let rules = InputRules::new().unwrap();
        let policy = ChallengePolicy::default();
        let challenges = RecordingChallenges::default();
        let mut session = LoginSession::new(LoginMode::SignIn);

        let bad = session.submit_credentials(
            "user@demo.com",
            "wrong",
            &accounts,
            &rules,
            &policy,
            &challenges,
        );
        assert_eq!(bad, Err(LoginError::InvalidCredentials));
        assert_eq!(session.stage(), LoginStage::Credentials);

        let wrong_case = session.submit_credentials(
            "USER@demo.com",
            "password123",
            &accounts,
            &rules,
            &policy,
            &challenges,
        );
        assert_eq!(wrong_case, Err(LoginError::InvalidCredentials));
        assert!(challenges.sent.lock().unwrap().is_empty());

        session
            .submit_credentials(
                "user@demo.com",
                "password123",
                &accounts,
                &rules,
                &policy,
                &challenges,
            )
            .unwrap();
        assert_eq!(session.stage(), LoginStage::CodeCheck);
        assert_eq!(challenges.sent.lock().unwrap().len(), 1);

        assert_eq!(
            session.submit_code("999999", &policy),
            Err(LoginError::InvalidCode)
        );
        assert_eq!(session.error(), Some(&LoginError::InvalidCode));
        assert_eq!(
            session.submit_code(" 123456", &policy),
            Err(LoginError::InvalidCode)
        );
        assert_eq!(session.stage(), LoginStage::CodeCheck);

        let user = session.submit_code("123456", &policy).unwrap();
        assert_eq!(session.stage(), LoginStage::Complete);
        assert_eq!(user.email, "user@demo.com");
        assert!(!user.is_new_account);
    }

    #[test]
    fn test_register_validates_fields() {
        let accounts = accounts();
        let rules = InputRules::new().unwrap();
        let policy = ChallengePolicy::default();
        let challenges = RecordingChallenges::default();
        let mut session = LoginSession::new(LoginMode::Register);

        let empty = session.submit_credentials("", "", &accounts, &rules, &policy, &challenges);
        assert_eq!(empty, Err(LoginError::MissingFields));

        let short = session.submit_credentials(
            "new@example.org",
            "abc",
            &accounts,
            &rules,
            &policy,
            &challenges,
        );
        assert_eq!(short, Err(LoginError::PasswordTooShort(8)));

        session
            .submit_credentials(
                "new@example.org",
                "longenough1",
                &accounts,
                &rules,
                &policy,
                &challenges,
            )
            .unwrap();
        let user = session.submit_code("123456", &policy).unwrap();
        assert!(user.is_new_account);
    }

    #[test]
    fn test_back_returns_to_credentials() {
        let accounts = accounts();
        let rules = InputRules::new().unwrap();
        let policy = ChallengePolicy::default();
        let challenges = RecordingChallenges::default();
        let mut session = LoginSession::new(LoginMode::SignIn);

        assert!(matches!(
            session.back(),
            Err(LoginError::WrongStage { .. })
        ));

        session
            .submit_credentials(
                "user@demo.com",
                "password123",
                &accounts,
                &rules,
                &policy,
                &challenges,
            )
            .unwrap();
        session.back().unwrap();
        assert_eq!(session.stage(), LoginStage::Credentials);
        assert!(matches!(
            session.submit_code("123456", &policy),
            Err(LoginError::WrongStage { .. })
        ));
    }
}
