use std::fmt;
use std::time::Duration;

use juriflow_core::JuriError;
use secrecy::SecretString;
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    /// `POST {base_url}/v1/chat/completions`
    OpenAiCompatible,
    /// `POST {base_url}/v1/messages`
    Anthropic,
}

#[derive(Clone)]
pub struct ProcessorConfig {
    pub provider: Provider,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub request_timeout: Duration,
    /// Name reported when the API key is missing.
    pub credential_name: String,
}

impl fmt::Debug for ProcessorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_some() {
            "<redacted>"
        } else {
            "<none>"
        };

        f.debug_struct("ProcessorConfig")
            .field("provider", &self.provider)
            .field("api_key", &api_key)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ProcessorConfig {
    /// Defaults for the fast, broad-purpose analytical model.
    pub fn primary() -> Self {
        Self {
            provider: Provider::OpenAiCompatible,
            api_key: None,
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: Some(0.2),
            max_tokens: None,
            request_timeout: Duration::from_secs(120),
            credential_name: "JURIFLOW_PRIMARY_API_KEY".to_string(),
        }
    }

    /// Defaults for the slower expert model used for review and fallback.
    pub fn secondary() -> Self {
        Self {
            provider: Provider::Anthropic,
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            model: "claude-3-5-sonnet-latest".to_string(),
            temperature: Some(0.1),
            max_tokens: Some(4096),
            request_timeout: Duration::from_secs(180),
            credential_name: "JURIFLOW_SECONDARY_API_KEY".to_string(),
        }
    }

    pub fn primary_from_env() -> Result<Self, JuriError> {
        Self::primary().with_env("JURIFLOW_PRIMARY")
    }

    pub fn secondary_from_env() -> Result<Self, JuriError> {
        Self::secondary().with_env("JURIFLOW_SECONDARY")
    }

    /// Overlays `{prefix}_API_KEY`, `{prefix}_BASE_URL`, `{prefix}_MODEL` and
    /// `{prefix}_TIMEOUT_SECS` when they are set.
    pub fn with_env(mut self, prefix: &str) -> Result<Self, JuriError> {
        let var = |suffix: &str| std::env::var(format!("{prefix}_{suffix}")).ok();

        if let Some(key) = var("API_KEY") {
            self = self.api_key(key);
        }
        if let Some(base_url) = var("BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(model) = var("MODEL") {
            self.model = model;
        }
        if let Some(timeout) = var("TIMEOUT_SECS") {
            let secs = timeout.trim().parse::<u64>().map_err(|_| {
                JuriError::InvalidConfig(format!("{prefix}_TIMEOUT_SECS must be an integer"))
            })?;
            self.request_timeout = Duration::from_secs(secs);
        }
        self.credential_name = format!("{prefix}_API_KEY");
        self.validate()?;
        Ok(self)
    }

    pub fn api_key(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.api_key = if value.trim().is_empty() {
            None
        } else {
            Some(SecretString::new(value))
        };
        self
    }

    pub fn base_url(mut self, value: impl Into<String>) -> Self {
        self.base_url = value.into();
        self
    }

    pub fn model(mut self, value: impl Into<String>) -> Self {
        self.model = value.into();
        self
    }

    pub fn temperature(mut self, value: f32) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn max_tokens(mut self, value: u32) -> Self {
        self.max_tokens = Some(value);
        self
    }

    pub fn request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = value;
        self
    }

    pub fn validate(&self) -> Result<(), JuriError> {
        Url::parse(&self.base_url).map_err(|err| {
            JuriError::InvalidConfig(format!("invalid base_url '{}': {err}", self.base_url))
        })?;
        if self.model.trim().is_empty() {
            return Err(JuriError::InvalidConfig("model must not be empty".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(JuriError::InvalidConfig(
                "request_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let config = ProcessorConfig::primary().api_key("sk-very-secret");
        let rendered = format!("{config:?}");
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("sk-very-secret"));
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = ProcessorConfig::secondary().api_key("   ");
        assert!(config.api_key.is_none());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let err = ProcessorConfig::primary()
            .base_url("not a url")
            .validate()
            .unwrap_err();
        assert!(matches!(err, JuriError::InvalidConfig(_)));
    }

    #[test]
    fn env_overlay_reads_prefixed_variables() {
        std::env::set_var("JURIFLOW_TEST_OVERLAY_API_KEY", "key-123");
        std::env::set_var("JURIFLOW_TEST_OVERLAY_MODEL", "local-model");
        std::env::set_var("JURIFLOW_TEST_OVERLAY_TIMEOUT_SECS", "7");

        let config = ProcessorConfig::primary()
            .with_env("JURIFLOW_TEST_OVERLAY")
            .unwrap();
        assert!(config.api_key.is_some());
        assert_eq!(config.model, "local-model");
        assert_eq!(config.request_timeout, Duration::from_secs(7));
        assert_eq!(config.credential_name, "JURIFLOW_TEST_OVERLAY_API_KEY");
    }
}
