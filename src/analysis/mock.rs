use super::{AnalysisError, AnalysisSuggestion, ImageAnalyzer};
use crate::config::AnalysisConfig;
use crate::taxonomy::Category;
use async_trait::async_trait;
use std::time::Duration;

/// Offline stand-in used when no API key is available
#[derive(Debug, Clone)]
pub struct MockAnalyzer {
    delay: Duration,
}

impl MockAnalyzer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(Duration::from_millis(config.mock_delay_ms))
    }

    pub fn suggestion() -> AnalysisSuggestion {
        AnalysisSuggestion {
            title: Some("Mock: Black Headphones".to_string()),
            description: Some(
                "A pair of over-ear black headphones, likely for listening to music. \
                 They appear to be in good condition."
                    .to_string(),
            ),
            category: Some(Category::Electronics),
            subcategory: Some("Headphones".to_string()),
        }
    }
}

#[async_trait]
impl ImageAnalyzer for MockAnalyzer {
    async fn analyze(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<AnalysisSuggestion, AnalysisError> {
        log::debug!(
            "Using mock analysis for {} byte {mime_type} image",
            image.len()
        );
        tokio::time::sleep(self.delay).await;
        Ok(Self::suggestion())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_fixed_suggestion() {
        let analyzer = MockAnalyzer::new(Duration::from_millis(1));
        let suggestion = analyzer.analyze(b"\x89PNG", "image/png").await.unwrap();

        assert_eq!(suggestion.title.as_deref(), Some("Mock: Black Headphones"));
        assert_eq!(suggestion.category, Some(Category::Electronics));
        assert_eq!(suggestion.subcategory.as_deref(), Some("Headphones"));
        assert!(Category::Electronics.permits("Headphones"));
    }

    #[tokio::test]
    async fn test_mock_waits_for_configured_delay() {
        let config = AnalysisConfig {
            mock_delay_ms: 25,
            ..AnalysisConfig::default()
        };
        let analyzer = MockAnalyzer::from_config(&config);
        let started = std::time::Instant::now();
        analyzer.analyze(b"img", "image/jpeg").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(25));
    }
}
