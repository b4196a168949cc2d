use std::sync::Arc;

use juriflow::prelude::*;
use serde_json::json;

struct Echo;

#[async_trait::async_trait]
impl Processor for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    async fn initialize(&self) -> Result<(), JuriError> {
        Ok(())
    }

    async fn generate(&self, _context: &Value, prompt: &str) -> Result<String, JuriError> {
        Ok(format!("echo: {}", prompt.lines().last().unwrap_or_default()))
    }
}

#[tokio::test]
async fn prelude_covers_a_full_query() {
    let orchestrator = QueryOrchestrator::new(Arc::new(Echo), Arc::new(Echo));
    let context = QueryContext::from_value(json!({"case_type": "civil"})).unwrap();

    let outcome = orchestrator
        .process_legal_query(context, "Who pays the costs?", None)
        .await
        .unwrap();

    let result = outcome.result().unwrap();
    assert_eq!(result.initial_analysis, "echo: Question: Who pays the costs?");
}

#[tokio::test]
async fn unconfigured_backend_reports_missing_credential() {
    let primary = LlmProcessor::primary(ProcessorConfig::primary());
    let secondary = LlmProcessor::secondary(ProcessorConfig::secondary());
    let orchestrator = QueryOrchestrator::new(Arc::new(primary), Arc::new(secondary));
    let context = QueryContext::from_value(json!({"case_type": "labor"})).unwrap();

    let outcome = orchestrator
        .process_legal_query(context, "Was the dismissal lawful?", None)
        .await
        .unwrap();

    assert_eq!(outcome.error().unwrap().error_type, "missing_credential");
}
