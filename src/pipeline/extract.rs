//! Structured extraction: page images + dated prompt → [`ResumeRecord`].
//!
//! One `generateContent` call per resume. The system instruction is the
//! prompt file, the single user turn carries every page image in document
//! order, and the generation config pins `temperature = 0` with a JSON
//! response constrained to the alias-keyed schema from [`crate::schema`].
//!
//! ## Error classification
//!
//! Provider failures are sorted into quota exhaustion and everything else
//! here, once, so callers never parse error text:
//!
//! 1. HTTP 429 or an error `status` of `RESOURCE_EXHAUSTED` → quota;
//! 2. otherwise the message is matched against
//!    [`crate::error::QUOTA_MARKERS`] (fallback for errors that only carry text);
//! 3. anything left is a generic provider error.
//!
//! There are no retries. A timeout is a generic provider error.

use crate::config::{ApiKey, Settings};
use crate::error::{mentions_quota, Cv2DocError};
use crate::pipeline::encode::PageImage;
use crate::prompts::{load_prompt, today};
use crate::schema::{ResumeRecord, RESUME};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Turns ordered page images into a validated resume record.
#[async_trait]
pub trait ResumeExtractor: Send + Sync {
    async fn extract(&self, pages: &[PageImage]) -> Result<ResumeRecord, Cv2DocError>;
}

/// [`ResumeExtractor`] calling the Gemini `generateContent` REST API.
#[derive(Debug, Clone)]
pub struct GeminiExtractor {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: ApiKey,
    prompt_path: PathBuf,
    timeout_secs: u64,
}

impl GeminiExtractor {
    pub fn from_settings(settings: &Settings) -> Result<Self, Cv2DocError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| Cv2DocError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            prompt_path: settings.prompt_path.clone(),
            timeout_secs: settings.request_timeout_secs,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn transport_error(&self, e: reqwest::Error) -> Cv2DocError {
        if e.is_timeout() {
            Cv2DocError::Provider {
                message: format!("request timed out after {}s", self.timeout_secs),
            }
        } else {
            // The URL carries a port number that could read as a quota marker.
            let status = e.status().map(|s| s.as_u16());
            classify_provider_error(status, None, e.without_url().to_string())
        }
    }
}

#[async_trait]
impl ResumeExtractor for GeminiExtractor {
    async fn extract(&self, pages: &[PageImage]) -> Result<ResumeRecord, Cv2DocError> {
        let prompt = load_prompt(&self.prompt_path, today())?;
        let request = build_request(&prompt, pages);

        info!(
            "Extracting resume from {} page(s) with {}",
            pages.len(),
            self.model
        );
        let start = Instant::now();

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let err = error_from_body(status.as_u16(), &body);
            warn!("Provider call failed after {:?}: {}", start.elapsed(), err);
            return Err(err);
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| Cv2DocError::Provider {
                message: format!("unreadable provider response: {e}"),
            })?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                "{} input tokens, {} output tokens, {:?}",
                usage.prompt_token_count.unwrap_or(0),
                usage.candidates_token_count.unwrap_or(0),
                start.elapsed()
            );
        }

        let text = response_text(parsed)?;
        parse_record(&text)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    InlineData(Blob<'a>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    status: Option<String>,
}

// ── Request / response helpers ───────────────────────────────────────────

/// Build the request body: prompt as system instruction, all pages in one user turn.
pub fn build_request<'a>(prompt: &'a str, pages: &'a [PageImage]) -> GenerateContentRequest<'a> {
    let parts = pages
        .iter()
        .map(|p| {
            Part::InlineData(Blob {
                mime_type: &p.mime_type,
                data: &p.data,
            })
        })
        .collect();

    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part::Text(prompt)],
        },
        contents: vec![Content {
            role: Some("user"),
            parts,
        }],
        generation_config: GenerationConfig {
            temperature: 0.0,
            response_mime_type: "application/json",
            response_schema: RESUME.response_schema(),
        },
    }
}

/// Classify a provider failure into quota exhaustion or a generic error.
pub fn classify_provider_error(
    http_status: Option<u16>,
    api_status: Option<&str>,
    message: String,
) -> Cv2DocError {
    let structured_quota = http_status == Some(429)
        || api_status.is_some_and(|s| s.eq_ignore_ascii_case("RESOURCE_EXHAUSTED"));

    if structured_quota || mentions_quota(&message) {
        Cv2DocError::QuotaExhausted { message }
    } else {
        Cv2DocError::Provider { message }
    }
}

/// Turn a non-2xx response body into a classified error.
///
/// Google APIs answer `{"error": {"code", "message", "status"}}`; other
/// bodies are kept verbatim.
fn error_from_body(http_status: u16, body: &str) -> Cv2DocError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = envelope
                .error
                .message
                .unwrap_or_else(|| format!("HTTP {http_status}"));
            classify_provider_error(
                Some(http_status),
                envelope.error.status.as_deref(),
                message,
            )
        }
        Err(_) => {
            let trimmed = body.trim();
            let message = if trimmed.is_empty() {
                format!("HTTP {http_status}")
            } else {
                format!("HTTP {http_status}: {trimmed}")
            };
            classify_provider_error(Some(http_status), None, message)
        }
    }
}

/// Concatenated text of the first candidate.
fn response_text(response: GenerateContentResponse) -> Result<String, Cv2DocError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(Cv2DocError::SchemaViolation {
            detail: format!("model returned no output ({reason})"),
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(Cv2DocError::SchemaViolation {
            detail: format!(
                "model returned empty output (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        });
    }
    Ok(text)
}

/// Strip a surrounding markdown code fence, if the model added one.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) up to the first newline.
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Decode the model's aliased JSON text into a record.
pub fn parse_record(text: &str) -> Result<ResumeRecord, Cv2DocError> {
    let value: Value =
        serde_json::from_str(strip_code_fence(text)).map_err(|e| Cv2DocError::SchemaViolation {
            detail: format!("model output is not valid JSON: {e}"),
        })?;
    ResumeRecord::from_aliased(value)
}
