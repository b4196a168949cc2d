//! Single-call orchestration of a legal query across a primary and a
//! secondary processor.

mod config;
mod orchestrator;
mod outcome;
mod prompts;

pub use config::OrchestratorConfig;
pub use orchestrator::QueryOrchestrator;
pub use outcome::{ErrorResult, PerformanceMetrics, QueryOutcome, QueryResult};
