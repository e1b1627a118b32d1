#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! LLM providers that turn a grading prompt into a reply.

/// Google Gemini backend over its REST API.
pub mod gemini;
/// OpenAI chat completions backend.
pub mod openai;

use std::{fmt, future::Future, str::FromStr, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use gemini::GeminiGrader;
pub use openai::OpenAiGrader;

use crate::{
    config::{ConfigError, ConfigState},
    prompt::CONNECTION_PROBE,
};

/// Supported LLM providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// OpenAI chat completions.
    #[default]
    OpenAi,
    /// Google Gemini.
    Gemini,
}

impl Provider {
    /// Model used when the caller does not name one.
    pub fn default_model(self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Gemini => "gemini-1.5-flash",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn api_key_var(self) -> &'static str {
        match self {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }

    /// Human-readable provider name.
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::OpenAi => "OpenAI",
            Provider::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            other => Err(format!("unknown provider `{other}` (expected openai or gemini)")),
        }
    }
}

/// Failures reported by a provider call. None of these are retried.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider rejected the API key.
    #[error("{provider} rejected the API key: {message}")]
    Authentication {
        /// Provider that failed.
        provider: Provider,
        /// Message returned by the provider.
        message:  String,
    },
    /// The account is out of quota or is being rate limited.
    #[error("{provider} quota exceeded: {message}")]
    Quota {
        /// Provider that failed.
        provider: Provider,
        /// Message returned by the provider.
        message:  String,
    },
    /// The call did not finish within the configured timeout.
    #[error("{provider} did not respond within {timeout:?}")]
    Timeout {
        /// Provider that failed.
        provider: Provider,
        /// Timeout that expired.
        timeout:  Duration,
    },
    /// The request never produced an HTTP response.
    #[error("Error calling {provider} API: {message}")]
    Transport {
        /// Provider that failed.
        provider: Provider,
        /// Transport error description.
        message:  String,
    },
    /// The provider answered with an error status or an unusable body.
    #[error("{provider} returned an unexpected response: {message}")]
    Response {
        /// Provider that failed.
        provider: Provider,
        /// HTTP status, when known.
        status:   Option<u16>,
        /// Description of the problem.
        message:  String,
    },
}

impl ProviderError {
    /// Provider that produced this error.
    pub fn provider(&self) -> Provider {
        match self {
            ProviderError::Authentication { provider, .. }
            | ProviderError::Quota { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::Transport { provider, .. }
            | ProviderError::Response { provider, .. } => *provider,
        }
    }

    /// True when the credentials themselves are the problem.
    pub fn is_authentication(&self) -> bool {
        matches!(self, ProviderError::Authentication { .. })
    }

    /// True when trying again later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Timeout { .. } | ProviderError::Transport { .. } => true,
            ProviderError::Response { status, .. } => status.is_some_and(|s| s >= 500),
            ProviderError::Authentication { .. } | ProviderError::Quota { .. } => false,
        }
    }

    /// Classifies an HTTP error status returned by `provider`.
    pub(crate) fn from_status(provider: Provider, status: u16, message: String) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication { provider, message },
            429 => ProviderError::Quota { provider, message },
            _ => ProviderError::Response {
                provider,
                status: Some(status),
                message,
            },
        }
    }
}

/// Capability to grade a prompt with a remote LLM.
///
/// A call consumes provider quota and is not idempotent; callers decide
/// whether to repeat it.
#[async_trait]
pub trait Grader: Send + Sync {
    /// Provider behind this grader.
    fn provider(&self) -> Provider;

    /// Model identifier sent with each request.
    fn model(&self) -> &str;

    /// Sends `prompt` and returns the reply text.
    async fn grade(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Sends a tiny prompt to confirm the credentials work.
    async fn check_connection(&self) -> Result<String, ProviderError> {
        self.grade(CONNECTION_PROBE).await
    }
}

/// Runs a provider call, turning an expired `limit` into
/// [`ProviderError::Timeout`].
pub(crate) async fn with_timeout<F>(
    provider: Provider,
    limit: Duration,
    call: F,
) -> Result<String, ProviderError>
where
    F: Future<Output = Result<String, ProviderError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout {
            provider,
            timeout: limit,
        }),
    }
}

/// Builds the grader for `provider` from configuration.
///
/// `model` overrides the provider's default model.
pub fn build_grader(
    provider: Provider,
    config: &ConfigState,
    model: Option<&str>,
) -> Result<Box<dyn Grader>, ConfigError> {
    let model = model
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(provider.default_model())
        .to_string();

    let missing = || ConfigError::MissingCredential {
        provider,
        var: provider.api_key_var(),
    };

    let grader: Box<dyn Grader> = match provider {
        Provider::OpenAi => {
            let env = config.openai().ok_or_else(missing)?;
            Box::new(OpenAiGrader::new(env, model, config.timeout()))
        }
        Provider::Gemini => {
            let env = config.gemini().ok_or_else(missing)?;
            let client = config
                .http_client()
                .map_err(|err| ConfigError::Client {
                    provider,
                    message: format!("{err:#}"),
                })?;
            Box::new(GeminiGrader::new(env, client, model, config.timeout()))
        }
    };

    tracing::debug!("Built {} grader using model {}", provider, grader.model());
    Ok(grader)
}
