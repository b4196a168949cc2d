use async_trait::async_trait;

use crate::{JuriError, Value};

/// Uniform contract over a single model backend.
///
/// `initialize` is idempotent: the first successful call builds the backend
/// handle and later calls are no-ops. `generate` initializes on demand, so
/// callers may skip the explicit call.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    /// Short label used in logs and metrics.
    fn name(&self) -> &str;

    async fn initialize(&self) -> Result<(), JuriError>;

    /// Sends `prompt` with `context` embedded and returns the plain-text reply.
    async fn generate(&self, context: &Value, prompt: &str) -> Result<String, JuriError>;
}
