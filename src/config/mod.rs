pub mod toml_config;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DemoAccount {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct VerificationConfig {
    pub email_code: String,
    pub mobile_code: String,
    /// Unset means unlimited retries on the code-check stages
    pub max_code_attempts: Option<u32>,
    pub min_password_length: usize,
    pub accounts: Vec<DemoAccount>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            email_code: "123456".to_string(),
            mobile_code: "654321".to_string(),
            max_code_attempts: None,
            min_password_length: 8,
            accounts: vec![DemoAccount {
                email: "user@demo.com".to_string(),
                password: "password123".to_string(),
            }],
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset
    pub api_key_env: String,
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub mock_delay_ms: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_key_env: "API_KEY".to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            timeout_seconds: 30,
            mock_delay_ms: 1500,
        }
    }
}

impl AnalysisConfig {
    /// Configured key, falling back to the environment
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(&self.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Unset keeps submitted reports local
    pub endpoint: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let v = &self.verification;
        if v.email_code.trim().is_empty() || v.mobile_code.trim().is_empty() {
            bail!("verification codes must not be empty");
        }
        if v.min_password_length == 0 {
            bail!("min_password_length must be at least 1");
        }
        if v.max_code_attempts == Some(0) {
            bail!("max_code_attempts must be at least 1 when set");
        }

        Url::parse(&self.analysis.base_url)
            .with_context(|| format!("Invalid analysis base_url: {}", self.analysis.base_url))?;
        if self.analysis.model.trim().is_empty() {
            bail!("analysis model must not be empty");
        }

        if let Some(endpoint) = &self.submission.endpoint {
            let url = Url::parse(endpoint)
                .with_context(|| format!("Invalid submission endpoint: {endpoint}"))?;
            if !matches!(url.scheme(), "http" | "https") {
                bail!("submission endpoint must use http or https: {endpoint}");
            }
        }
        Ok(())
    }
}

/// Load a YAML or TOML configuration chosen by file extension. A missing
/// file yields the defaults.
pub fn load(path: &str) -> anyhow::Result<Config> {
    let p = Path::new(path);
    if !p.exists() {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        return Ok(Config::default());
    }

    if is_toml(p) {
        return toml_config::load_toml_config(p);
    }
    let config =
        Config::from_file(path).with_context(|| format!("Failed to parse YAML config: {path}"))?;
    config.validate()?;
    Ok(config)
}

/// Write a configuration in the format its file extension names.
pub fn save(config: &Config, path: &str) -> anyhow::Result<()> {
    let p = Path::new(path);
    if is_toml(p) {
        toml_config::write_toml_config(config, p)
    } else {
        config.to_file(path)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.verification.accounts.len(), 1);
        assert_eq!(config.analysis.model, "gemini-2.5-flash");
        assert!(config.submission.endpoint.is_none());
    }

    #[test]
    fn test_yaml_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.yaml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.verification.max_code_attempts = Some(5);
        config.submission.endpoint = Some("https://reports.example.in/api/reports".to_string());
        config.to_file(path).unwrap();

        let loaded = load(path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "verification:\n  max_code_attempts: 3\nlogging:\n  level: debug").unwrap();

        let loaded = load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(loaded.verification.max_code_attempts, Some(3));
        assert_eq!(loaded.verification.email_code, "123456");
        assert_eq!(loaded.logging.level_filter(), log::LevelFilter::Debug);
        assert_eq!(loaded.analysis.timeout_seconds, 30);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let loaded = load("/nonexistent/lostfound-report.yaml").unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_validation_rejects_bad_endpoint() {
        let mut config = Config::default();
        config.submission.endpoint = Some("not a url".to_string());
        assert!(config.validate().is_err());

        config.submission.endpoint = Some("ftp://reports.example.in".to_string());
        assert!(config.validate().is_err());

        config.submission.endpoint = None;
        config.verification.max_code_attempts = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_resolution_prefers_config() {
        let config = AnalysisConfig {
            api_key: Some("configured".to_string()),
            api_key_env: "LOSTFOUND_TEST_UNSET_KEY".to_string(),
            ..AnalysisConfig::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("configured"));

        let blank = AnalysisConfig {
            api_key: Some("  ".to_string()),
            api_key_env: "LOSTFOUND_TEST_UNSET_KEY".to_string(),
            ..AnalysisConfig::default()
        };
        assert_eq!(blank.resolve_api_key(), None);
    }
}
