#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    sync::{Arc, OnceLock},
    time::Duration,
};

use anyhow::{Context, Result};
use reqwest::Client;
use state::InitCell;
use thiserror::Error;

use crate::grader::Provider;

/// Default Gemini REST endpoint.
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
/// Default sampling temperature for chat completions.
const DEFAULT_TEMPERATURE: f32 = 0.2;
/// Default completion token budget.
const DEFAULT_MAX_TOKENS: u32 = 700;
/// Default provider call timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default number of gradings allowed per session.
const DEFAULT_MAX_GRADES: u32 = 20;
/// Default minimum gap between two gradings, in seconds.
const DEFAULT_MIN_INTERVAL_SECS: u64 = 5;

/// Configuration problems detected before any request is attempted.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No API key is configured for the selected provider.
    #[error("{var} not set (in .env or environment).")]
    MissingCredential {
        /// Provider that was selected.
        provider: Provider,
        /// Environment variable that should hold the key.
        var:      &'static str,
    },
    /// The provider client could not be constructed.
    #[error("Error initializing provider {provider}: {message}")]
    Client {
        /// Provider that failed to initialize.
        provider: Provider,
        /// Reason reported by the client library.
        message:  String,
    },
}

/// OpenAI credentials and tuning parameters sourced from the environment.
#[derive(Clone, Debug)]
pub struct OpenAiEnv {
    /// Optional override for the OpenAI-compatible API base.
    api_base:    Option<String>,
    /// API key used to authenticate OpenAI requests.
    api_key:     String,
    /// Sampling temperature.
    temperature: f32,
    /// Maximum number of tokens in the completion.
    max_tokens:  u32,
}

impl OpenAiEnv {
    /// Returns the API base override, if any.
    pub fn api_base(&self) -> Option<&str> {
        self.api_base.as_deref()
    }

    /// Returns the API key used for OpenAI requests.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the sampling temperature.
    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Returns the completion token budget.
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Gemini credentials sourced from the environment.
#[derive(Clone, Debug)]
pub struct GeminiEnv {
    /// Base URL of the Gemini REST API, without a trailing slash.
    endpoint: String,
    /// API key sent with every request.
    api_key:  String,
}

impl GeminiEnv {
    /// Returns the base URL of the Gemini API.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the API key used for Gemini requests.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

/// Runtime configuration shared across the crate.
pub struct ConfigState {
    /// OpenAI configuration, present when `OPENAI_API_KEY` is set.
    openai:       Option<OpenAiEnv>,
    /// Gemini configuration, present when `GEMINI_API_KEY` is set.
    gemini:       Option<GeminiEnv>,
    /// Upper bound on a single provider call.
    timeout:      Duration,
    /// Gradings allowed per session.
    max_grades:   u32,
    /// Minimum gap between two gradings in one session.
    min_interval: Duration,
    /// Lazily constructed HTTP client shared by the REST backends.
    http_client:  InitCell<Client>,
}

impl ConfigState {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup. Blank values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let openai = read("OPENAI_API_KEY").map(|api_key| OpenAiEnv {
            api_base: read("OPENAI_ENDPOINT"),
            api_key,
            temperature: read("OPENAI_TEMPERATURE")
                .and_then(|s| s.parse::<f32>().ok())
                .unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: read("OPENAI_MAX_TOKENS")
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(DEFAULT_MAX_TOKENS),
        });

        let gemini = read("GEMINI_API_KEY").map(|api_key| GeminiEnv {
            endpoint: read("GEMINI_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_owned(),
            api_key,
        });

        let secs = |key: &str, default: u64| {
            read(key)
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(default))
        };

        Self {
            openai,
            gemini,
            timeout: secs("AIGRADE_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            max_grades: read("AIGRADE_MAX_GRADES")
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(DEFAULT_MAX_GRADES),
            min_interval: secs("AIGRADE_MIN_INTERVAL_SECS", DEFAULT_MIN_INTERVAL_SECS),
            http_client: InitCell::new(),
        }
    }

    /// Returns the OpenAI configuration, if a key is configured.
    pub fn openai(&self) -> Option<&OpenAiEnv> {
        self.openai.as_ref()
    }

    /// Returns the Gemini configuration, if a key is configured.
    pub fn gemini(&self) -> Option<&GeminiEnv> {
        self.gemini.as_ref()
    }

    /// Returns true when credentials for `provider` are present.
    pub fn has_credentials(&self, provider: Provider) -> bool {
        match provider {
            Provider::OpenAi => self.openai.is_some(),
            Provider::Gemini => self.gemini.is_some(),
        }
    }

    /// Returns the provider call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the number of gradings allowed per session.
    pub fn max_grades(&self) -> u32 {
        self.max_grades
    }

    /// Returns the minimum gap between two gradings.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Returns the shared HTTP client, building it on first use.
    pub fn http_client(&self) -> Result<Client> {
        if let Some(client) = self.http_client.try_get() {
            return Ok(client.clone());
        }

        let client = Client::builder()
            // Avoid macOS dynamic store lookups that fail in sandboxed environments.
            .no_proxy()
            .build()
            .context("Failed to construct shared HTTP client")?;
        self.http_client.set(client);
        Ok(self.http_client.get().clone())
    }
}

/// Shared configuration handle used throughout the crate.
#[derive(Clone)]
pub struct ConfigHandle(Arc<ConfigState>);

impl std::ops::Deref for ConfigHandle {
    type Target = ConfigState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<ConfigState> for ConfigHandle {
    fn from(state: ConfigState) -> Self {
        Self(Arc::new(state))
    }
}

/// Global storage for the lazily constructed configuration.
static CONFIG_SLOT: OnceLock<ConfigHandle> = OnceLock::new();

/// Returns the process configuration, reading the environment on first use.
pub fn get() -> ConfigHandle {
    CONFIG_SLOT
        .get_or_init(|| ConfigState::from_env().into())
        .clone()
}

/// Returns the process configuration with its shared HTTP client built, so
/// client construction failures surface before any command runs.
pub fn ensure_initialized() -> Result<ConfigHandle> {
    let config = get();
    config.http_client()?;
    Ok(config)
}
