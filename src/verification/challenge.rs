use crate::config::{DemoAccount, VerificationConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Channel a one-time code is delivered over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Mobile,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Email => f.write_str("email"),
            Channel::Mobile => f.write_str("mobile"),
        }
    }
}

/// Issues one-time codes. Delivery is fire-and-forget from the caller's side.
pub trait ChallengeService: Send + Sync {
    fn dispatch_code(&self, channel: Channel, address: &str);
}

/// Account lookups used while verifying identity
pub trait AccountDirectory: Send + Sync {
    fn is_known_account(&self, email: &str) -> bool;
    fn verify_password(&self, email: &str, password: &str) -> bool;
}

/// Expected codes and retry policy for the code-check stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengePolicy {
    pub email_code: String,
    pub mobile_code: String,
    /// `None` allows unlimited retries
    pub max_attempts: Option<u32>,
    pub min_password_length: usize,
}

impl Default for ChallengePolicy {
    fn default() -> Self {
        Self::from_config(&VerificationConfig::default())
    }
}

impl ChallengePolicy {
    pub fn from_config(config: &VerificationConfig) -> Self {
        Self {
            email_code: config.email_code.clone(),
            mobile_code: config.mobile_code.clone(),
            max_attempts: config.max_code_attempts,
            min_password_length: config.min_password_length,
        }
    }

    pub fn expected_code(&self, channel: Channel) -> &str {
        match channel {
            Channel::Email => &self.email_code,
            Channel::Mobile => &self.mobile_code,
        }
    }
}

/// Writes dispatched codes to the log instead of delivering them
#[derive(Debug, Default)]
pub struct LogChallengeService;

impl ChallengeService for LogChallengeService {
    fn dispatch_code(&self, channel: Channel, address: &str) {
        // Real delivery goes through an email/SMS gateway; the demo only records the request
        log::info!("One-time code requested over {channel} for {address}");
    }
}

/// In-memory account directory seeded from configuration
#[derive(Debug, Clone, Default)]
pub struct DemoAccountDirectory {
    accounts: Vec<DemoAccount>,
}

impl DemoAccountDirectory {
    pub fn new(accounts: Vec<DemoAccount>) -> Self {
        Self { accounts }
    }

    pub fn from_config(config: &VerificationConfig) -> Self {
        Self::new(config.accounts.clone())
    }

}

impl AccountDirectory for DemoAccountDirectory {
    fn is_known_account(&self, email: &str) -> bool {
        self.accounts
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(email))
    }

    /// Sign-in matches the stored address exactly
    fn verify_password(&self, email: &str, password: &str) -> bool {
        self.accounts
            .iter()
            .any(|a| a.email == email && a.password == password)
    }
}
