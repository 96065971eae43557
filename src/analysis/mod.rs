//! Image analysis: turn a photo of an item into suggested report fields.
//!
//! Two analyzers implement [`ImageAnalyzer`]: [`GeminiAnalyzer`] talks to the
//! hosted multimodal model, [`MockAnalyzer`] returns a canned suggestion after
//! a short delay. [`analyzer_from_config`] picks one based on whether an API
//! key is available.

pub mod gemini;
pub mod mock;

pub use gemini::GeminiAnalyzer;
pub use mock::MockAnalyzer;

use crate::config::AnalysisConfig;
use crate::taxonomy::Category;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Fields proposed by an analyzer. Any of them may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisSuggestion {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub subcategory: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Analysis service error: {0}")]
    Api(String),
    #[error("Invalid analysis response: {0}")]
    InvalidResponse(String),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),
}

impl AnalysisError {
    /// Message shown to the user; they can always continue by hand
    pub fn user_message(&self) -> &'static str {
        match self {
            AnalysisError::UnsupportedImage(_) => "Please choose an image file.",
            _ => "Failed to analyze image. Please try again or enter details manually.",
        }
    }
}

#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<AnalysisSuggestion, AnalysisError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Live analyzer when a key is configured or present in the environment,
/// otherwise the offline stand-in
pub fn analyzer_from_config(config: &AnalysisConfig) -> Arc<dyn ImageAnalyzer> {
    match config.resolve_api_key() {
        Some(key) => match GeminiAnalyzer::new(config, key) {
            Ok(analyzer) => {
                log::info!("Using live image analysis (model {})", config.model);
                Arc::new(analyzer)
            }
            Err(e) => {
                log::error!("Failed to build image analysis client: {e}, using mock data");
                Arc::new(MockAnalyzer::from_config(config))
            }
        },
        None => {
            log::warn!(
                "{} environment variable not set. Using mock data.",
                config.api_key_env
            );
            Arc::new(MockAnalyzer::from_config(config))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_falls_back_to_mock_without_key() {
        let config = AnalysisConfig {
            api_key: None,
            api_key_env: "LOSTFOUND_TEST_MISSING_ANALYSIS_KEY".to_string(),
            ..AnalysisConfig::default()
        };
        assert_eq!(analyzer_from_config(&config).name(), "mock");
    }

    #[test]
    fn test_uses_live_client_with_key() {
        let config = AnalysisConfig {
            api_key: Some("test-key".to_string()),
            ..AnalysisConfig::default()
        };
        assert_eq!(analyzer_from_config(&config).name(), "gemini");
    }

    #[test]
    fn test_suggestion_category_uses_display_names() {
        let suggestion: AnalysisSuggestion = serde_json::from_str(
            r#"{"title":"Brown Wallet","description":null,"category":"Personal Items","subcategory":"Watch"}"#,
        )
        .unwrap();
        assert_eq!(suggestion.category, Some(Category::PersonalItems));
        assert!(suggestion.description.is_none());
    }
}
