#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Grader, Provider, ProviderError, with_timeout};
use crate::config::GeminiEnv;

/// Request body for `generateContent`.
#[derive(Serialize)]
struct GeminiRequest {
    /// Conversation turns; grading sends exactly one.
    contents: Vec<Content>,
}

/// A single turn of the request.
#[derive(Serialize)]
struct Content {
    /// Parts of the turn.
    parts: Vec<Part>,
}

/// A text part of a request turn.
#[derive(Serialize)]
struct Part {
    /// Prompt text.
    text: String,
}

/// Response body of `generateContent`.
#[derive(Deserialize)]
struct GeminiResponse {
    /// Candidate completions; absent when the prompt was blocked.
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// One candidate completion.
#[derive(Deserialize)]
struct Candidate {
    /// Generated content, absent for some finish reasons.
    content: Option<ContentResponse>,
}

/// Content of a candidate.
#[derive(Deserialize)]
struct ContentResponse {
    /// Generated parts.
    #[serde(default)]
    parts: Vec<PartResponse>,
}

/// A generated part. Non-text parts carry no `text`.
#[derive(Deserialize)]
struct PartResponse {
    /// Generated text.
    text: Option<String>,
}

/// Error envelope returned with non-success statuses.
#[derive(Deserialize)]
struct ErrorEnvelope {
    /// Error details.
    error: ErrorBody,
}

/// Google API error details.
#[derive(Deserialize)]
struct ErrorBody {
    /// Human-readable message.
    #[serde(default)]
    message: String,
    /// Canonical status name, e.g. `RESOURCE_EXHAUSTED`.
    #[serde(default)]
    status:  String,
}

/// Grades prompts with Google Gemini.
pub struct GeminiGrader {
    /// Shared HTTP client.
    client:   Client,
    /// API base URL.
    endpoint: String,
    /// API key sent in the `x-goog-api-key` header.
    api_key:  String,
    /// Model identifier.
    model:    String,
    /// Upper bound on one call.
    timeout:  Duration,
}

impl GeminiGrader {
    /// Creates a grader from Gemini settings.
    pub fn new(env: &GeminiEnv, client: Client, model: String, timeout: Duration) -> Self {
        Self {
            client,
            endpoint: env.endpoint().to_string(),
            api_key: env.api_key().to_string(),
            model,
            timeout,
        }
    }

    /// URL of the `generateContent` method for the configured model.
    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }

    /// Performs the request without a deadline.
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let provider = Provider::Gemini;
        let body = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                provider,
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| ProviderError::Transport {
            provider,
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &text));
        }

        extract_text(&text)
    }
}

#[async_trait]
impl Grader for GeminiGrader {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn grade(&self, prompt: &str) -> Result<String, ProviderError> {
        tracing::debug!("Sending {} prompt chars to Gemini ({})", prompt.len(), self.model);
        with_timeout(Provider::Gemini, self.timeout, self.generate(prompt)).await
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, ProviderError> {
    let provider = Provider::Gemini;
    let response: GeminiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Response {
            provider,
            status: None,
            message: format!("error decoding response body: {e}"),
        })?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ProviderError::Response {
            provider,
            status: None,
            message: "the response contained no text".to_string(),
        });
    }
    Ok(text)
}

/// Classifies a non-success response.
///
/// Gemini answers a bad key with `400 INVALID_ARGUMENT`, so the message is
/// inspected as well as the status code.
fn classify_failure(status: u16, body: &str) -> ProviderError {
    let provider = Provider::Gemini;
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return ProviderError::from_status(provider, status, body.trim().to_string());
    };
    let ErrorBody { message, status: name } = envelope.error;

    match name.as_str() {
        "UNAUTHENTICATED" | "PERMISSION_DENIED" => {
            ProviderError::Authentication { provider, message }
        }
        "RESOURCE_EXHAUSTED" => ProviderError::Quota { provider, message },
        _ if message.contains("API key") => ProviderError::Authentication { provider, message },
        _ => ProviderError::from_status(provider, status, message),
    }
}
