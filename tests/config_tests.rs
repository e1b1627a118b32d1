use std::{collections::HashMap, time::Duration};

use aigrade::{
    Provider, ProviderError, ReportField,
    config::{ConfigError, ConfigState},
    grader::build_grader,
    parse,
};

fn config_from(pairs: &[(&str, &str)]) -> ConfigState {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ConfigState::from_lookup(move |key| vars.get(key).cloned())
}

#[test]
fn defaults_apply_when_nothing_is_set() {
    let config = config_from(&[]);

    assert!(config.openai().is_none());
    assert!(config.gemini().is_none());
    assert_eq!(config.timeout(), Duration::from_secs(120));
    assert_eq!(config.max_grades(), 20);
    assert_eq!(config.min_interval(), Duration::from_secs(5));

    let config = config_from(&[("OPENAI_API_KEY", "sk-test")]);
    let openai = config.openai().expect("openai configured");
    assert_eq!(openai.api_base(), None);
    assert_eq!(openai.temperature(), 0.2);
    assert_eq!(openai.max_tokens(), 700);
}

#[test]
fn blank_values_count_as_unset() {
    let config = config_from(&[
        ("OPENAI_API_KEY", "   "),
        ("GEMINI_API_KEY", "gm-key"),
        ("AIGRADE_MAX_GRADES", ""),
        ("AIGRADE_TIMEOUT_SECS", "not a number"),
    ]);

    assert!(!config.has_credentials(Provider::OpenAi));
    assert!(config.has_credentials(Provider::Gemini));
    assert_eq!(config.max_grades(), 20);
    assert_eq!(config.timeout(), Duration::from_secs(120));
}

#[test]
fn provider_settings_are_read() {
    let config = config_from(&[
        ("OPENAI_API_KEY", " sk-test \n"),
        ("OPENAI_ENDPOINT", "http://localhost:8080/v1"),
        ("OPENAI_TEMPERATURE", "0.7"),
        ("OPENAI_MAX_TOKENS", "400"),
        ("GEMINI_API_KEY", "gm-key"),
        ("GEMINI_ENDPOINT", "http://localhost:9090/"),
        ("AIGRADE_MIN_INTERVAL_SECS", "0"),
    ]);

    let openai = config.openai().expect("openai configured");
    assert_eq!(openai.api_key(), "sk-test");
    assert_eq!(openai.api_base(), Some("http://localhost:8080/v1"));
    assert_eq!(openai.temperature(), 0.7);
    assert_eq!(openai.max_tokens(), 400);

    let gemini = config.gemini().expect("gemini configured");
    assert_eq!(gemini.endpoint(), "http://localhost:9090");
    assert_eq!(config.min_interval(), Duration::ZERO);
}

#[test]
fn missing_key_names_the_variable() {
    let config = config_from(&[("OPENAI_API_KEY", "sk-test")]);

    match build_grader(Provider::Gemini, &config, None) {
        Err(err @ ConfigError::MissingCredential { provider, var }) => {
            assert_eq!(provider, Provider::Gemini);
            assert_eq!(var, "GEMINI_API_KEY");
            assert_eq!(err.to_string(), "GEMINI_API_KEY not set (in .env or environment).");
        }
        Err(other) => panic!("expected a missing credential, got {other}"),
        Ok(_) => panic!("expected a missing credential"),
    }
}

#[tokio::test]
async fn graders_use_the_requested_or_default_model() {
    let config = config_from(&[("OPENAI_API_KEY", "sk-test"), ("GEMINI_API_KEY", "gm-key")]);

    let openai = build_grader(Provider::OpenAi, &config, None).expect("openai grader");
    assert_eq!(openai.provider(), Provider::OpenAi);
    assert_eq!(openai.model(), "gpt-4o-mini");

    let gemini = build_grader(Provider::Gemini, &config, Some("gemini-1.5-pro")).expect("gemini");
    assert_eq!(gemini.model(), "gemini-1.5-pro");

    let blank = build_grader(Provider::Gemini, &config, Some("  ")).expect("gemini");
    assert_eq!(blank.model(), "gemini-1.5-flash");
}

#[test]
fn provider_names_round_trip_through_the_cli() {
    assert_eq!("openai".parse::<Provider>(), Ok(Provider::OpenAi));
    assert_eq!("Gemini".parse::<Provider>(), Ok(Provider::Gemini));
    assert!("claude".parse::<Provider>().is_err());

    assert_eq!(Provider::OpenAi.to_string(), "OpenAI");
    assert_eq!(Provider::Gemini.api_key_var(), "GEMINI_API_KEY");
}

#[test]
fn provider_errors_classify_transience() {
    let timeout = ProviderError::Timeout {
        provider: Provider::OpenAi,
        timeout:  Duration::from_secs(1),
    };
    assert!(timeout.is_transient());
    assert!(!timeout.is_authentication());
    assert_eq!(timeout.provider(), Provider::OpenAi);

    let quota = ProviderError::Quota {
        provider: Provider::OpenAi,
        message:  "insufficient_quota".to_string(),
    };
    assert!(!quota.is_transient());
}

#[test]
fn table_rows_cover_every_field() {
    let rows = parse("SCORE: 88\n").rows();

    assert_eq!(rows.len(), ReportField::ALL.len());
    assert_eq!(rows[0].field, "score");
    assert_eq!(rows[0].value, "88");
    assert!(rows[1..].iter().all(|row| row.value == "N/A"));
}
