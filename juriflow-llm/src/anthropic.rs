//! Client for the Anthropic Messages API.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use juriflow_core::{JuriError, LlmRequest, LlmResponse, Role};

use crate::processor::{transport_error, ChatModel};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct AnthropicClient {
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
    http: Client,
}

impl AnthropicClient {
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

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

/// System messages move to the top-level `system` field; the rest keep order.
fn split_system(request: LlmRequest) -> (Option<String>, Vec<AnthropicMessage>) {
    let mut system = Vec::new();
    let mut messages = Vec::new();
    for message in request.messages {
        match message.role {
            Role::System => system.push(message.content),
            Role::User => messages.push(AnthropicMessage {
                role: "user",
                content: message.content,
            }),
            Role::Assistant => messages.push(AnthropicMessage {
                role: "assistant",
                content: message.content,
            }),
        }
    }
    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (system, messages)
}

#[async_trait::async_trait]
impl ChatModel for AnthropicClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse, JuriError> {
        let model = request.model.clone();
        let max_tokens = request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        let temperature = request.temperature;
        let (system, messages) = split_system(request);
        let body = MessagesRequest {
            model,
            max_tokens,
            system,
            messages,
            temperature,
        };

        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|err| transport_error(err, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<AnthropicError>(&text)
                .map(|err| err.error.message)
                .unwrap_or(text);
            return Err(JuriError::Backend(format!("{status}: {message}")));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|err| JuriError::Backend(format!("malformed message: {err}")))?;

        let content = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(LlmResponse {
            content,
            model: parsed.model,
        })
    }
}
