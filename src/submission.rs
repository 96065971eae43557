//! Committing a confirmed report to the report service.

use crate::config::SubmissionConfig;
use crate::draft::ReportDraft;
use crate::taxonomy::{Category, City, ReportKind};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identifier assigned to a report by the service that accepted it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Report rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("Report service error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("Invalid response from report service: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ReportSubmitter: Send + Sync {
    async fn submit(&self, draft: &ReportDraft) -> Result<ReportId, SubmissionError>;
}

/// Wire form of a report, field values copied from the draft as-is
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub report_type: ReportKind,
    pub category: Option<Category>,
    pub subcategory: String,
    pub item_name: String,
    pub description: String,
    pub location: String,
    pub city: City,
    pub serial_number: String,
    pub tags: Vec<String>,
    pub image: Option<ImagePayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Base64 of the raw image bytes
    pub data: String,
}

impl ReportPayload {
    pub fn from_draft(draft: &ReportDraft) -> Self {
        Self {
            report_type: draft.kind(),
            category: draft.category(),
            subcategory: draft.subcategory().to_string(),
            item_name: draft.title().to_string(),
            description: draft.description().to_string(),
            location: draft.location().to_string(),
            city: draft.city(),
            serial_number: draft.serial_number().to_string(),
            tags: draft.tags(),
            image: draft.image().map(|image| ImagePayload {
                mime_type: image.mime_type().to_string(),
                file_name: image.file_name().map(str::to_string),
                data: image.to_base64(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: Option<String>,
}

/// Posts reports as JSON to a remote endpoint
#[derive(Debug, Clone)]
pub struct HttpReportSubmitter {
    client: Client,
    endpoint: String,
}

impl HttpReportSubmitter {
    pub fn new(endpoint: &str, timeout_seconds: u64) -> Result<Self, SubmissionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| SubmissionError::Network(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    fn interpret(status: StatusCode, body: &str) -> Result<ReportId, SubmissionError> {
        if status.is_client_error() {
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }
        if !status.is_success() {
            return Err(SubmissionError::Server {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        let response: SubmitResponse = serde_json::from_str(body)
            .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))?;
        match response.id {
            Some(id) if !id.trim().is_empty() => Ok(ReportId::new(id)),
            _ => Err(SubmissionError::InvalidResponse(
                "response has no report id".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ReportSubmitter for HttpReportSubmitter {
    async fn submit(&self, draft: &ReportDraft) -> Result<ReportId, SubmissionError> {
        let payload = ReportPayload::from_draft(draft);
        log::info!(
            "Submitting {} report to {}",
            draft.kind().label(),
            self.endpoint
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                log::error!("Report submission failed: {e}");
                SubmissionError::Network(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        let result = Self::interpret(status, &body);
        match &result {
            Ok(id) => log::info!("Report accepted with id {id}"),
            Err(e) => log::error!("Report service returned {status}: {e}"),
        }
        result
    }
}

/// Accepts every report locally and numbers them per run
#[derive(Debug, Default)]
pub struct LocalReportSubmitter {
    next: AtomicU64,
}

impl LocalReportSubmitter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportSubmitter for LocalReportSubmitter {
    async fn submit(&self, draft: &ReportDraft) -> Result<ReportId, SubmissionError> {
        let sequence = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        let id = ReportId::new(format!(
            "LF-{}-{:04}",
            chrono::Local::now().format("%Y%m%d"),
            sequence
        ));

        let payload = ReportPayload::from_draft(draft);
        log::info!(
            "Recorded {} '{}' in {} as {id}",
            draft.kind().label(),
            payload.item_name,
            payload.city.as_str()
        );
        if log::log_enabled!(log::Level::Debug) {
            // Image data is summarised rather than dumped
            let mut summary = payload;
            if let Some(image) = summary.image.as_mut() {
                image.data = format!("<{} base64 chars>", image.data.len());
            }
            match serde_json::to_string(&summary) {
                Ok(json) => log::debug!("Report {id}: {json}"),
                Err(e) => log::debug!("Report {id} could not be serialized: {e}"),
            }
        }
        Ok(id)
    }
}

/// HTTP submitter when an endpoint is configured, local otherwise
pub fn submitter_from_config(
    config: &SubmissionConfig,
) -> Result<Arc<dyn ReportSubmitter>, SubmissionError> {
    match &config.endpoint {
        Some(endpoint) => {
            log::info!("Reports will be submitted to {endpoint}");
            Ok(Arc::new(HttpReportSubmitter::new(
                endpoint,
                config.timeout_seconds,
            )?))
        }
        None => {
            log::info!("No submission endpoint configured, recording reports locally");
            Ok(Arc::new(LocalReportSubmitter::new()))
        }
    }
}
