//! Client for the Gemini `generateContent` endpoint.
//!
//! The image is sent inline next to an instruction prompt, and the model is
//! asked for JSON constrained by a response schema whose `category` is limited
//! to the report categories.

use super::{AnalysisError, AnalysisSuggestion, ImageAnalyzer};
use crate::config::AnalysisConfig;
use crate::taxonomy::Category;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

#[derive(Clone)]
pub struct GeminiAnalyzer {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Model output before the category is checked against the taxonomy
#[derive(Debug, Deserialize)]
struct RawSuggestion {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    subcategory: Option<String>,
}

impl GeminiAnalyzer {
    pub fn new(config: &AnalysisConfig, api_key: String) -> Result<Self, AnalysisError> {
        if api_key.trim().is_empty() {
            return Err(AnalysisError::Api("API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn prompt() -> String {
        format!(
            "Analyze the image of this item. Based on the image, provide a concise and clear \
             title, a helpful description, suggest the most appropriate category, and a \
             suitable subcategory for a lost and found website. The available categories are: \
             {}. The subcategory should be a specific type of the item (e.g., 'Smartphone' for \
             the 'Electronics' category, or 'Backpack' for 'Bags').",
            Category::names().join(", ")
        )
    }

    fn response_schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "title": {
                    "type": "STRING",
                    "description": "A short, descriptive title for the item (e.g., 'Black Leather Wallet', 'Silver iPhone 13')."
                },
                "description": {
                    "type": "STRING",
                    "description": "A brief, helpful description of the item, noting any distinguishing features visible in the image."
                },
                "category": {
                    "type": "STRING",
                    "enum": Category::names(),
                    "description": "The most fitting category from the provided list."
                },
                "subcategory": {
                    "type": "STRING",
                    "description": "A specific subcategory for the item (e.g., 'Headphones', 'Backpack', 'Passport')."
                }
            },
            "required": ["title", "description", "category", "subcategory"]
        })
    }

    fn build_request(image: &[u8], mime_type: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        inline_data: Some(InlineData {
                            mime_type: mime_type.to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(image),
                        }),
                        text: None,
                    },
                    Part {
                        inline_data: None,
                        text: Some(Self::prompt()),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: Self::response_schema(),
            },
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    /// Pull the first candidate's text out of a raw response body
    fn extract_text(body: &str) -> Result<String, AnalysisError> {
        let response: GenerateResponse = serde_json::from_str(body)?;
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::InvalidResponse("No candidates in response".into()))?;

        candidate
            .content
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AnalysisError::InvalidResponse("No text part in candidate".into()))
    }

    fn parse_suggestion(text: &str) -> Result<AnalysisSuggestion, AnalysisError> {
        // Models occasionally wrap JSON in a markdown fence despite the mime type
        let cleaned = text
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let raw: RawSuggestion = serde_json::from_str(cleaned)?;
        let category = match raw.category.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(name) => Some(
                name.parse::<Category>()
                    .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?,
            ),
        };

        Ok(AnalysisSuggestion {
            title: raw.title,
            description: raw.description,
            category,
            subcategory: raw.subcategory,
        })
    }
}

#[async_trait]
impl ImageAnalyzer for GeminiAnalyzer {
    async fn analyze(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<AnalysisSuggestion, AnalysisError> {
        if !mime_type.starts_with("image/") {
            return Err(AnalysisError::UnsupportedImage(mime_type.to_string()));
        }

        let url = self.endpoint();
        log::info!(
            "Sending {} byte {mime_type} image for analysis: {}",
            image.len(),
            url.replace(&self.api_key, "***")
        );

        let response = self
            .client
            .post(&url)
            .json(&Self::build_request(image, mime_type))
            .send()
            .await
            .map_err(|e| {
                // the URL carries the key
                let e = e.without_url();
                log::error!("Image analysis request failed: {e}");
                e
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| e.without_url())?;
        log::debug!("Analysis response status: {status}");

        if !status.is_success() {
            log::error!("Image analysis service error: {status} - {body}");
            return Err(AnalysisError::Api(format!("HTTP {status}: {body}")));
        }

        let text = Self::extract_text(&body)?;
        let suggestion = Self::parse_suggestion(&text).map_err(|e| {
            log::error!("Failed to parse analysis result: {e}");
            e
        })?;
        log::info!(
            "Image analysis suggested {:?} / {:?}",
            suggestion.category,
            suggestion.subcategory
        );
        Ok(suggestion)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
