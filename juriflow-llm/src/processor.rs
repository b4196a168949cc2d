use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::OnceCell;

use juriflow_core::{JuriError, LlmRequest, LlmResponse, Message, Processor};

use crate::{AnthropicClient, OpenAiCompatibleClient, ProcessorConfig, Provider};

const PRIMARY_SYSTEM_PROMPT: &str = "You are a legal analyst. Give a structured, factual \
analysis of the case, citing the applicable legal basis and noting missing information.";

const SECONDARY_SYSTEM_PROMPT: &str = "You are a senior legal expert reviewing an analysis \
prepared by a colleague. Validate it, correct errors and give concrete recommendations.";

const REDACTED_KEY_MARKERS: [&str; 4] = ["key", "token", "secret", "password"];

/// Raw transport to a model provider.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, JuriError>;
}

pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> JuriError {
    if err.is_timeout() {
        JuriError::Timeout(timeout)
    } else {
        JuriError::Backend(err.to_string())
    }
}

/// Drops credential-looking keys and nulls, recursively.
pub fn sanitize_context(context: &Value) -> Value {
    match context {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .iter()
                .filter(|(key, value)| {
                    let key = key.to_lowercase();
                    !value.is_null()
                        && !REDACTED_KEY_MARKERS
                            .iter()
                            .any(|marker| key.contains(marker))
                })
                .map(|(key, value)| (key.clone(), sanitize_context(value)))
                .collect();
            Value::Object(cleaned)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_context).collect()),
        other => other.clone(),
    }
}

pub fn compose_prompt(context: &Value, prompt: &str) -> String {
    let sanitized = sanitize_context(context);
    let block = serde_json::to_string_pretty(&sanitized).unwrap_or_else(|_| "{}".to_string());
    format!("Case context:\n{block}\n\nTask:\n{prompt}")
}

/// A [`Processor`] over one configured provider.
///
/// The provider client is built on first use and reused afterwards.
pub struct LlmProcessor {
    label: String,
    config: ProcessorConfig,
    system_prompt: String,
    model: OnceCell<Arc<dyn ChatModel>>,
}

impl LlmProcessor {
    pub fn new(label: impl Into<String>, config: ProcessorConfig) -> Self {
        Self {
            label: label.into(),
            config,
            system_prompt: PRIMARY_SYSTEM_PROMPT.to_string(),
            model: OnceCell::new(),
        }
    }

    pub fn primary(config: ProcessorConfig) -> Self {
        Self::new("primary", config)
    }

    pub fn secondary(config: ProcessorConfig) -> Self {
        Self::new("secondary", config).with_system_prompt(SECONDARY_SYSTEM_PROMPT)
    }

    /// Uses an already-built transport instead of constructing one from config.
    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = OnceCell::new_with(Some(model));
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.model.initialized()
    }

    fn build_model(&self) -> Result<Arc<dyn ChatModel>, JuriError> {
        let api_key = self
            .config
            .api_key
            .clone()
            .ok_or_else(|| JuriError::MissingCredential(self.config.credential_name.clone()))?;
        self.config.validate()?;

        let timeout = self.config.request_timeout;
        let model: Arc<dyn ChatModel> = match self.config.provider {
            Provider::OpenAiCompatible => Arc::new(OpenAiCompatibleClient::new(
                self.config.base_url.clone(),
                api_key,
                timeout,
            )?),
            Provider::Anthropic => Arc::new(AnthropicClient::new(
                self.config.base_url.clone(),
                api_key,
                timeout,
            )?),
        };
        tracing::debug!(
            processor = %self.label,
            provider = ?self.config.provider,
            model = %self.config.model,
            "model handle initialized"
        );
        Ok(model)
    }

    async fn handle(&self) -> Result<&Arc<dyn ChatModel>, JuriError> {
        self.model
            .get_or_try_init(|| async { self.build_model() })
            .await
    }
}

#[async_trait]
impl Processor for LlmProcessor {
    fn name(&self) -> &str {
        &self.label
    }

    async fn initialize(&self) -> Result<(), JuriError> {
        self.handle().await.map(|_| ())
    }

    async fn generate(&self, context: &Value, prompt: &str) -> Result<String, JuriError> {
        let model = self.handle().await?;
        let request = LlmRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message::system(self.system_prompt.clone()),
                Message::user(compose_prompt(context, prompt)),
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let started = Instant::now();
        let response = model.complete(request).await.map_err(|err| {
            tracing::warn!(processor = %self.label, error = %err, "model call failed");
            err
        })?;
        tracing::debug!(
            processor = %self.label,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "model call finished"
        );

        let text = response.content.trim();
        if text.is_empty() {
            return Err(JuriError::EmptyResponse(
                response.model.unwrap_or_else(|| self.config.model.clone()),
            ));
        }
        Ok(text.to_string())
    }
}
