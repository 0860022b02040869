//! GeminiApiAgent - Direct REST API implementation for Gemini.
//!
//! Sends a single-part text prompt to `{endpoint}/{model}:generateContent`
//! with the API key as the `key` query parameter and returns the text of the
//! first part of the first candidate.

use async_trait::async_trait;
use lumen_core::config::GenerationConfig;
use lumen_core::error::{LumenError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Shown when the endpoint returns a well-formed but empty reply.
pub const EMPTY_REPLY_TEXT: &str = "No reply";

/// Issues generation requests on behalf of the controller.
///
/// The API key is passed per request because it is captured at runtime by the
/// credential gate. Implementations must return `GenerationAborted` promptly
/// once `cancel` fires.
#[async_trait]
pub trait GenerationAgent: Send + Sync {
    async fn generate(
        &self,
        api_key: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String>;
}

/// Agent implementation that talks to the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiApiAgent {
    client: Client,
    endpoint: String,
    model: String,
}

impl GeminiApiAgent {
    /// Creates an agent from the generation settings, applying the request deadline.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| LumenError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn request_url(&self) -> String {
        format!("{}/{}:generateContent", self.endpoint, self.model)
    }

    async fn send_request(&self, api_key: &str, body: &GenerateContentRequest) -> Result<String> {
        let response = self
            .client
            .post(self.request_url())
            .query(&[("key", api_key)])
            .json(body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LumenError::request_failed("Gemini API request timed out")
                } else {
                    LumenError::request_failed(format!("Gemini API request failed: {err}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let body_text = response
            .text()
            .await
            .map_err(|err| LumenError::request_failed(format!("Failed to read Gemini response: {err}")))?;

        let parsed: GenerateContentResponse = serde_json::from_str(&body_text)
            .map_err(|err| LumenError::malformed(format!("Failed to parse Gemini response: {err}")))?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl GenerationAgent for GeminiApiAgent {
    async fn generate(
        &self,
        api_key: &str,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(LumenError::GenerationAborted);
        }

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        tracing::debug!(model = %self.model, prompt_chars = prompt.len(), "sending generation request");

        // Dropping the request future aborts the underlying connection
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LumenError::GenerationAborted),
            result = self.send_request(api_key, &request) => result,
        }
    }
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    parts: Option<Vec<PartResponse>>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String> {
    let text = response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts)
        .and_then(|parts| parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| {
            LumenError::malformed("Gemini API returned no text in the first candidate part")
        })?;

    if text.is_empty() {
        Ok(EMPTY_REPLY_TEXT.to_string())
    } else {
        Ok(text)
    }
}

fn map_http_error(status: StatusCode, body: String) -> LumenError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.clone());

    LumenError::request_failed_with_status(status.as_u16(), message)
}
