//! Client for any provider exposing OpenAI's chat completions format.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use juriflow_core::{JuriError, LlmRequest, LlmResponse, Message};

use crate::processor::{transport_error, ChatModel};

#[derive(Serialize, Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Choice {
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
struct OpenAiError {
    error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
struct ErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
    http: Client,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, JuriError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| JuriError::InvalidConfig(err.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key,
            timeout,
            http,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiCompatibleClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, JuriError> {
        let body = ChatCompletionRequest {
            model: request.model,
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        };

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|err| transport_error(err, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&text)
                .map(|err| err.error.message)
                .unwrap_or(text);
            return Err(JuriError::Backend(format!("{status}: {message}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| JuriError::Backend(format!("malformed completion: {err}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(LlmResponse {
            content,
            model: parsed.model,
        })
    }
}
