pub mod anthropic;
mod config;
pub mod openai_compatible;
mod processor;

pub use anthropic::AnthropicClient;
pub use config::{ProcessorConfig, Provider};
pub use juriflow_core::{LlmRequest, LlmResponse, Message, Role};
pub use openai_compatible::OpenAiCompatibleClient;
pub use processor::{compose_prompt, sanitize_context, ChatModel, LlmProcessor};
