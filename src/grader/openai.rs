#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::Duration;

use async_openai::{
    Client as OpenAIClient,
    config::OpenAIConfig,
    error::{ApiError, OpenAIError},
    types::chat::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;

use super::{Grader, Provider, ProviderError, with_timeout};
use crate::config::OpenAiEnv;

/// Error codes and types OpenAI uses for rejected credentials.
const AUTH_CODES: [&str; 2] = ["invalid_api_key", "invalid_authentication"];
/// Error codes and types OpenAI uses for quota and rate limits.
const QUOTA_CODES: [&str; 2] = ["insufficient_quota", "rate_limit_exceeded"];

/// Grades prompts with OpenAI chat completions.
pub struct OpenAiGrader {
    /// Configured API client.
    client:      OpenAIClient<OpenAIConfig>,
    /// Model identifier.
    model:       String,
    /// Sampling temperature.
    temperature: f32,
    /// Completion token budget.
    max_tokens:  u32,
    /// Upper bound on one call.
    timeout:     Duration,
}

impl OpenAiGrader {
    /// Creates a grader from OpenAI settings.
    pub fn new(env: &OpenAiEnv, model: String, timeout: Duration) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(env.api_key());
        if let Some(base) = env.api_base() {
            config = config.with_api_base(base);
        }

        Self {
            client: OpenAIClient::with_config(config),
            model,
            temperature: env.temperature(),
            max_tokens: env.max_tokens(),
            timeout,
        }
    }

    /// Performs the chat completion without a deadline.
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()
            .map_err(classify)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(classify)?;

        let response = self.client.chat().create(request).await.map_err(classify)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Response {
                provider: Provider::OpenAi,
                status:   None,
                message:  "the completion contained no text".to_string(),
            })
    }
}

#[async_trait]
impl Grader for OpenAiGrader {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn grade(&self, prompt: &str) -> Result<String, ProviderError> {
        tracing::debug!("Sending {} prompt chars to OpenAI ({})", prompt.len(), self.model);
        with_timeout(Provider::OpenAi, self.timeout, self.complete(prompt)).await
    }
}

/// Maps an `async-openai` error onto [`ProviderError`].
fn classify(err: OpenAIError) -> ProviderError {
    let provider = Provider::OpenAi;
    match err {
        OpenAIError::ApiError(response) => {
            classify_api_error(Some(response.status_code.as_u16()), response.api_error)
        }
        OpenAIError::InvalidArgument(message) => ProviderError::Response {
            provider,
            status: None,
            message,
        },
        other => ProviderError::Transport {
            provider,
            message: other.to_string(),
        },
    }
}

/// Sorts an API error body by its `code`/`type` fields, then by HTTP status.
fn classify_api_error(status: Option<u16>, api: ApiError) -> ProviderError {
    let provider = Provider::OpenAi;
    let tags = [api.code.as_deref(), api.r#type.as_deref()];
    let has = |codes: &[&str]| tags.iter().flatten().any(|tag| codes.contains(tag));

    if has(&AUTH_CODES) {
        ProviderError::Authentication {
            provider,
            message: api.message,
        }
    } else if has(&QUOTA_CODES) {
        ProviderError::Quota {
            provider,
            message: api.message,
        }
    } else if let Some(status) = status {
        ProviderError::from_status(provider, status, api.message)
    } else {
        ProviderError::Response {
            provider,
            status: None,
            message: api.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn api_error(body: serde_json::Value) -> ApiError {
        serde_json::from_value(body).expect("valid error body")
    }

    #[test]
    fn invalid_key_is_an_authentication_error() {
        let err = classify_api_error(
            Some(401),
            api_error(json!({"message": "Incorrect API key provided", "code": "invalid_api_key"})),
        );
        assert!(err.is_authentication());
        assert!(!err.is_transient());
        assert!(err.to_string().contains("Incorrect API key provided"));
    }

    #[test]
    fn quota_is_recognised_by_code_or_type() {
        let by_code = classify_api_error(
            Some(429),
            api_error(json!({"message": "out of credit", "code": "insufficient_quota"})),
        );
        assert!(matches!(by_code, ProviderError::Quota { .. }));

        let by_type = classify_api_error(
            None,
            api_error(json!({"message": "slow down", "type": "rate_limit_exceeded"})),
        );
        assert!(matches!(by_type, ProviderError::Quota { .. }));
        assert!(!by_type.is_transient());
    }

    #[test]
    fn unknown_code_falls_back_to_the_status() {
        let body = json!({"message": "model overloaded", "code": "server_busy"});

        let err = classify_api_error(None, api_error(body.clone()));
        assert!(matches!(err, ProviderError::Response { status: None, .. }));
        assert!(!err.is_transient());

        let err = classify_api_error(Some(503), api_error(body.clone()));
        assert!(matches!(err, ProviderError::Response { status: Some(503), .. }));
        assert!(err.is_transient());

        let err = classify_api_error(Some(401), api_error(body));
        assert!(err.is_authentication());
    }

    #[test]
    fn rejected_request_arguments_are_not_transient() {
        let err = classify(OpenAIError::InvalidArgument("messages is empty".to_string()));
        match &err {
            ProviderError::Response {
                status: None,
                message,
                ..
            } => assert_eq!(message, "messages is empty"),
            other => panic!("expected a response error, got {other:?}"),
        }
        assert!(!err.is_transient());
    }
}
