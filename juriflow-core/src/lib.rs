pub mod case;
mod error;
mod llm;
mod processor;
pub mod query;
pub mod retry;
pub mod services;

pub use case::{CaseDetails, CaseStore, InMemoryCaseStore, ProcessingState};
pub use error::{ErrorKind, JuriError};
pub use llm::{HistoryEntry, LlmRequest, LlmResponse, Message, Role};
pub use processor::Processor;
pub use query::{QueryContext, QueryOptions};
pub use retry::{is_retryable, RetryPolicy, RetryStrategy};
pub use services::{LegalResearch, PaymentService, PaymentStatus, QuotaService, QuotaStatus};

pub type Value = serde_json::Value;
