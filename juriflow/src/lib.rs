//! Resumable LLM query orchestration for legal-analysis pipelines.
//!
//! The default features give the single-call [`orchestrator`] over the HTTP
//! processors in [`llm`]. Enable `graph` for the checkpointed multi-step
//! workflow.

pub use juriflow_core as core;
pub use juriflow_core::{
    CaseStore, ErrorKind, InMemoryCaseStore, JuriError, Processor, QueryContext, QueryOptions,
    RetryPolicy, RetryStrategy,
};

#[cfg(feature = "llm")]
pub use juriflow_llm as llm;

#[cfg(feature = "memory")]
pub use juriflow_memory as memory;

#[cfg(feature = "graph")]
pub use juriflow_graph as graph;

#[cfg(feature = "orchestrator")]
pub use juriflow_orchestrator as orchestrator;

#[cfg(all(feature = "llm", feature = "orchestrator"))]
mod from_env {
    use std::sync::Arc;

    use juriflow_core::JuriError;
    use juriflow_llm::{LlmProcessor, ProcessorConfig};
    use juriflow_orchestrator::QueryOrchestrator;

    /// Orchestrator over the primary and secondary backends configured by the
    /// `JURIFLOW_PRIMARY_*` and `JURIFLOW_SECONDARY_*` environment variables.
    ///
    /// Missing API keys are not reported here; the first query fails with
    /// `missing_credential` instead.
    pub fn orchestrator_from_env() -> Result<QueryOrchestrator, JuriError> {
        let primary = LlmProcessor::primary(ProcessorConfig::primary_from_env()?);
        let secondary = LlmProcessor::secondary(ProcessorConfig::secondary_from_env()?);
        Ok(QueryOrchestrator::new(Arc::new(primary), Arc::new(secondary)))
    }
}

#[cfg(all(feature = "llm", feature = "orchestrator"))]
pub use from_env::orchestrator_from_env;

pub mod prelude {
    pub use juriflow_core::{
        CaseStore, InMemoryCaseStore, JuriError, Processor, QueryContext, RetryStrategy, Value,
    };

    #[cfg(feature = "llm")]
    pub use juriflow_llm::{LlmProcessor, ProcessorConfig};

    #[cfg(feature = "memory")]
    pub use juriflow_memory::ConversationWindow;

    #[cfg(feature = "graph")]
    pub use juriflow_graph::{
        ExecutionConfig, ExecutionContext, FileCheckpointer, InMemoryCheckpointer, LegalWorkflow,
        NodeId, WorkflowResponse, WorkflowServices,
    };

    #[cfg(feature = "orchestrator")]
    pub use juriflow_orchestrator::{OrchestratorConfig, QueryOrchestrator, QueryOutcome};
}
