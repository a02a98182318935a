use std::time::Duration;

use anyhow::{Context, Result};

use crate::ingest::DEFAULT_REFERENCE_MARKER;

pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
use crate::llm_client::{
    azure, openai, BackendKind, DEFAULT_MAX_ALLOWABLE_TOKENS, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct AzureSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

/// Application configuration loaded from environment variables.
/// Startup fails if a variable required by the selected backend is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub backend: BackendKind,
    pub openai: Option<OpenAiSettings>,
    pub azure: Option<AzureSettings>,
    pub model_id: String,
    pub max_allowable_tokens: usize,
    pub llm_timeout: Duration,
    pub reference_marker: String,
    /// Sessions untouched for this long are dropped.
    pub session_ttl: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let backend: BackendKind = get("LLM_BACKEND")
            .unwrap_or_else(|| "azure".to_string())
            .parse()
            .context("LLM_BACKEND must be 'openai' or 'azure'")?;

        let (openai, azure) = match backend {
            BackendKind::OpenAi => (
                Some(OpenAiSettings {
                    api_key: require("OPENAI_API_KEY")?,
                    base_url: get("OPENAI_BASE_URL")
                        .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
                }),
                None,
            ),
            BackendKind::Azure => (
                None,
                Some(AzureSettings {
                    endpoint: require("AZURE_OPENAI_ENDPOINT")?,
                    api_key: require("AZURE_OPENAI_API_KEY")?,
                    deployment: require("AZURE_OPENAI_DEPLOYMENT")?,
                    api_version: get("AZURE_OPENAI_API_VERSION")
                        .unwrap_or_else(|| azure::DEFAULT_API_VERSION.to_string()),
                }),
            ),
        };

        Ok(Config {
            backend,
            openai,
            azure,
            model_id: get("MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_allowable_tokens: get("MAX_ALLOWABLE_TOKENS")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("MAX_ALLOWABLE_TOKENS must be a positive integer")?
                .unwrap_or(DEFAULT_MAX_ALLOWABLE_TOKENS),
            llm_timeout: Duration::from_secs(
                get("LLM_TIMEOUT_SECS")
                    .map(|v| v.parse::<u64>())
                    .transpose()
                    .context("LLM_TIMEOUT_SECS must be a whole number of seconds")?
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            // Escaped newlines so the marker can be written on one line in .env.
            reference_marker: get("REFERENCE_MARKER")
                .map(|v| v.replace("\\n", "\n"))
                .unwrap_or_else(|| DEFAULT_REFERENCE_MARKER.to_string()),
            session_ttl: match get("SESSION_TTL_SECS") {
                None => Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
                Some(v) => v
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .map(Duration::from_secs)
                    .context("SESSION_TTL_SECS must be a positive number of seconds")?,
            },
            port: get("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

#[cfg(test)]
impl Config {
    /// Direct backend against a placeholder endpoint; tests swap in their own backend.
    pub fn for_tests() -> Self {
        Config {
            backend: BackendKind::OpenAi,
            openai: Some(OpenAiSettings {
                api_key: "sk-test".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
            }),
            azure: None,
            model_id: DEFAULT_MODEL.to_string(),
            max_allowable_tokens: DEFAULT_MAX_ALLOWABLE_TOKENS,
            llm_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            reference_marker: DEFAULT_REFERENCE_MARKER.to_string(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_azure_is_default_backend() {
        let config = Config::from_lookup(lookup(&[
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
            ("AZURE_OPENAI_API_KEY", "key"),
            ("AZURE_OPENAI_DEPLOYMENT", "gpt-4o"),
        ]))
        .unwrap();
        assert_eq!(config.backend, BackendKind::Azure);
        assert!(config.openai.is_none());
        let azure = config.azure.unwrap();
        assert_eq!(azure.api_version, azure::DEFAULT_API_VERSION);
        assert_eq!(config.model_id, DEFAULT_MODEL);
        assert_eq!(config.max_allowable_tokens, 150_000);
        assert_eq!(config.llm_timeout, Duration::from_secs(60));
        assert_eq!(config.reference_marker, "References\n");
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_openai_backend_requires_key() {
        let err = Config::from_lookup(lookup(&[("LLM_BACKEND", "openai")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let config = Config::from_lookup(lookup(&[
            ("LLM_BACKEND", "openai"),
            ("OPENAI_API_KEY", "sk-test"),
            ("MAX_ALLOWABLE_TOKENS", "1000"),
            ("REFERENCE_MARKER", "Bibliography\\n"),
        ]))
        .unwrap();
        assert_eq!(config.openai.unwrap().base_url, openai::DEFAULT_BASE_URL);
        assert_eq!(config.max_allowable_tokens, 1000);
        assert_eq!(config.reference_marker, "Bibliography\n");
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let err = Config::from_lookup(lookup(&[("LLM_BACKEND", "bedrock")])).unwrap_err();
        assert!(err.to_string().contains("LLM_BACKEND"));
    }

    #[test]
    fn test_session_ttl_must_be_positive() {
        let base = [("LLM_BACKEND", "openai"), ("OPENAI_API_KEY", "sk")];
        let config = Config::from_lookup(lookup(&[base[0], base[1], ("SESSION_TTL_SECS", "600")])).unwrap();
        assert_eq!(config.session_ttl, Duration::from_secs(600));

        let err = Config::from_lookup(lookup(&[base[0], base[1], ("SESSION_TTL_SECS", "0")])).unwrap_err();
        assert!(err.to_string().contains("SESSION_TTL_SECS"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("LLM_BACKEND", "openai"),
            ("OPENAI_API_KEY", "sk"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
