//! Google Generative Language REST backend.
//!
//! Two endpoints are used:
//!
//! * `GET  {base}/v1beta/models` — paginated catalog with each model's
//!   `supportedGenerationMethods`
//! * `POST {base}/v1beta/models/{model}:generateContent` — one-shot text
//!   generation
//!
//! The key travels in the `x-goog-api-key` header rather than the query
//! string so it never shows up in logged URLs. HTTP status codes are mapped
//! to typed errors in [`map_status`].

use super::{GenerateOptions, ModelInfo, SynthesisBackend};
use crate::config::SynthesisConfig;
use crate::error::NexusPathError;
use crate::output::Generation;
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

const PROVIDER: &str = "gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";
const PAGE_SIZE: &str = "1000";
/// Upper bound on `models.list` pages read for one catalog.
const MAX_CATALOG_PAGES: usize = 20;
const API_KEY_INVALID: &str = "API_KEY_INVALID";

/// Backend for the Gemini family of models.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    base_url: String,
    timeout_secs: Option<u64>,
}

impl GeminiBackend {
    pub fn new(config: &SynthesisConfig) -> Result<Self, NexusPathError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| NexusPathError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout_secs: config.request_timeout_secs,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> NexusPathError {
        if e.is_timeout() {
            NexusPathError::Timeout {
                provider: PROVIDER.into(),
                secs: self.timeout_secs.unwrap_or_default(),
            }
        } else {
            NexusPathError::Transport {
                provider: PROVIDER.into(),
                detail: e.to_string(),
            }
        }
    }

    /// Turn a non-success response into a typed error.
    async fn error_from_response(response: Response, model: Option<&str>) -> NexusPathError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        map_status(status, retry_after, &body, model)
    }
}

#[async_trait]
impl SynthesisBackend for GeminiBackend {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn list_models(&self, api_key: &str) -> Result<Vec<ModelInfo>, NexusPathError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();
        let mut pages_read = 0;

        loop {
            let mut request = self
                .client
                .get(&url)
                .header(API_KEY_HEADER, api_key)
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(ref token) = page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(|e| self.transport_error(e))?;
            if !response.status().is_success() {
                return Err(Self::error_from_response(response, None).await);
            }

            let page: ListModelsResponse = response.json().await.map_err(|e| {
                NexusPathError::LlmApiError {
                    message: format!("unreadable model list: {e}"),
                }
            })?;
            models.extend(page.models.into_iter().map(ModelInfo::from));
            pages_read += 1;

            match next_page_token(page.next_page_token, &mut seen_tokens, pages_read) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!("Gemini catalog: {} models", models.len());
        Ok(models)
    }

    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<Generation, NexusPathError> {
        let model = model.strip_prefix("models/").unwrap_or(model);
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": options.temperature,
                "maxOutputTokens": options.max_output_tokens,
            }
        });

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response, Some(model)).await);
        }

        let parsed: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| NexusPathError::LlmApiError {
                    message: format!("unreadable generateContent response: {e}"),
                })?;

        parsed.into_generation()
    }
}

/// The token to request next, or `None` once the catalog is complete.
///
/// Listing also stops on a token already requested and after
/// [`MAX_CATALOG_PAGES`] pages; the models read so far are kept.
fn next_page_token(
    next: Option<String>,
    seen: &mut HashSet<String>,
    pages_read: usize,
) -> Option<String> {
    let token = next.filter(|t| !t.is_empty())?;
    if pages_read >= MAX_CATALOG_PAGES {
        warn!("Gemini catalog truncated after {} pages", pages_read);
        return None;
    }
    if !seen.insert(token.clone()) {
        warn!("Gemini catalog repeated page token; stopping");
        return None;
    }
    Some(token)
}

/// Map an HTTP error status from the API to a typed error.
///
/// The API wraps failures as `{"error": {"message": …, "details": […]}}`; the
/// message is used when present, the raw body otherwise.
pub fn map_status(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: &str,
    model: Option<&str>,
) -> NexusPathError {
    let envelope = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
    let key_invalid = envelope.as_ref().is_some_and(|e| {
        e.error
            .details
            .iter()
            .any(|d| d.reason.as_deref() == Some(API_KEY_INVALID))
    });
    let detail = envelope
        .map(|e| e.error.message)
        .unwrap_or_else(|| body.trim().to_string());
    let detail = if detail.is_empty() {
        status.to_string()
    } else {
        detail
    };
    warn!("Gemini API returned {}", status);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => NexusPathError::AuthError {
            provider: PROVIDER.into(),
            detail,
        },
        // An invalid key comes back as 400 INVALID_ARGUMENT.
        StatusCode::BAD_REQUEST if key_invalid => NexusPathError::AuthError {
            provider: PROVIDER.into(),
            detail,
        },
        StatusCode::NOT_FOUND => NexusPathError::ModelNotFound {
            provider: PROVIDER.into(),
            model: model.unwrap_or("<catalog>").to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => NexusPathError::RateLimitExceeded {
            provider: PROVIDER.into(),
            retry_after_secs,
        },
        _ => NexusPathError::LlmApiError {
            message: format!("HTTP {}: {}", status.as_u16(), detail),
        },
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListModelsResponse {
    #[serde(default)]
    models: Vec<ApiModel>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiModel {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl From<ApiModel> for ModelInfo {
    fn from(m: ApiModel) -> Self {
        ModelInfo::new(m.name, m.supported_generation_methods)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
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
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenate the first candidate's text parts.
    fn into_generation(self) -> Result<Generation, NexusPathError> {
        let (input_tokens, output_tokens) = self
            .usage_metadata
            .map(|u| (u.prompt_token_count, u.candidates_token_count))
            .unwrap_or_default();

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(NexusPathError::EmptyResponse {
                provider: PROVIDER.into(),
                reason: self.prompt_feedback.and_then(|f| f.block_reason),
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(NexusPathError::EmptyResponse {
                provider: PROVIDER.into(),
                reason: candidate.finish_reason,
            });
        }

        Ok(Generation {
            text,
            input_tokens,
            output_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_follows_fresh_tokens() {
        let mut seen = HashSet::new();
        assert_eq!(
            next_page_token(Some("p2".into()), &mut seen, 1).as_deref(),
            Some("p2")
        );
        assert_eq!(
            next_page_token(Some("p3".into()), &mut seen, 2).as_deref(),
            Some("p3")
        );
        assert!(next_page_token(None, &mut seen, 3).is_none());
        assert!(next_page_token(Some(String::new()), &mut seen, 3).is_none());
    }

    #[test]
    fn pagination_stops_on_repeated_token() {
        let mut seen = HashSet::new();
        let mut pages = 0;
        let mut token = None;
        // A server that answers every page with the same token.
        loop {
            pages += 1;
            match next_page_token(Some("same".into()), &mut seen, pages) {
                Some(t) => token = Some(t),
                None => break,
            }
        }
        assert_eq!(pages, 2);
        assert_eq!(token.as_deref(), Some("same"));
    }

    #[test]
    fn pagination_is_capped() {
        let mut seen = HashSet::new();
        let mut pages = 0;
        while next_page_token(Some(format!("p{pages}")), &mut seen, pages + 1).is_some() {
            pages += 1;
        }
        assert_eq!(pages + 1, MAX_CATALOG_PAGES);
    }

    #[test]
    fn parses_generation_parts() {
        let raw = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Day 1"}, {"text": ": walk"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4, "totalTokenCount": 16}
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let generation = parsed.into_generation().unwrap();
        assert_eq!(generation.text, "Day 1: walk");
        assert_eq!(generation.input_tokens, 12);
        assert_eq!(generation.output_tokens, 4);
    }

    #[test]
    fn blocked_prompt_is_empty_response() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        let err = parsed.into_generation().unwrap_err();
        assert!(matches!(
            err,
            NexusPathError::EmptyResponse { reason: Some(ref r), .. } if r == "SAFETY"
        ));
    }

    #[test]
    fn candidate_without_text_is_empty_response() {
        let raw = r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            parsed.into_generation(),
            Err(NexusPathError::EmptyResponse { .. })
        ));
    }

    #[test]
    fn parses_model_catalog() {
        let raw = r#"{
            "models": [
                {"name": "models/gemini-1.5-flash", "supportedGenerationMethods": ["generateContent", "countTokens"]},
                {"name": "models/text-embedding-004", "supportedGenerationMethods": ["embedContent"]}
            ],
            "nextPageToken": ""
        }"#;
        let page: ListModelsResponse = serde_json::from_str(raw).unwrap();
        let models: Vec<ModelInfo> = page.models.into_iter().map(ModelInfo::from).collect();
        assert_eq!(models.len(), 2);
        assert!(models[0].supports_generation());
        assert!(!models[1].supports_generation());
    }

    #[test]
    fn status_mapping() {
        let body = r#"{"error": {"code": 403, "message": "Permission denied", "status": "PERMISSION_DENIED"}}"#;
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, None, body, None),
            NexusPathError::AuthError { ref detail, .. } if detail == "Permission denied"
        ));

        assert!(matches!(
            map_status(StatusCode::NOT_FOUND, None, "", Some("gemini-pro")),
            NexusPathError::ModelNotFound { ref model, .. } if model == "gemini-pro"
        ));

        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, Some(7), "", None),
            NexusPathError::RateLimitExceeded { retry_after_secs: Some(7), .. }
        ));

        let invalid_key = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT",
            "details": [{"reason": "API_KEY_INVALID"}]}}"#;
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, None, invalid_key, None),
            NexusPathError::AuthError { .. }
        ));

        let other = map_status(StatusCode::INTERNAL_SERVER_ERROR, None, "boom", None);
        assert_eq!(other.to_string(), "LLM API error: HTTP 500: boom");
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let config = SynthesisConfig::builder()
            .api_base_url("http://localhost:8080/")
            .build()
            .unwrap();
        let backend = GeminiBackend::new(&config).unwrap();
        assert_eq!(backend.base_url, "http://localhost:8080");
    }
}
