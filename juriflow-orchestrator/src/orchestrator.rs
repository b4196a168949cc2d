use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde_json::{json, Map, Value};
use tokio::time::{timeout, Instant};
use tracing::Instrument;

use juriflow_core::{
    CaseDetails, CaseStore, HistoryEntry, JuriError, Processor, QueryContext, QueryOptions, Role,
};
use juriflow_memory::ConversationWindow;

use crate::prompts;
use crate::{ErrorResult, OrchestratorConfig, PerformanceMetrics, QueryOutcome, QueryResult};

const INITIAL_STAGE: &str = "initial_analysis";
const EXPERT_STAGE: &str = "expert_recommendations";

/// How the initial analysis was obtained.
#[derive(Debug, Default)]
struct PrimaryAnalysis {
    text: String,
    partial_results: Option<Vec<String>>,
    fallback_used: bool,
}

/// Entry point for one end-to-end legal query.
///
/// Runs the primary processor under the strategy the query context selects,
/// then always asks the secondary processor for expert recommendations.
/// Only a non-numeric `claim_value` comes back as `Err`; every other failure
/// is folded into [`QueryOutcome::Failure`].
pub struct QueryOrchestrator {
    primary: Arc<dyn Processor>,
    secondary: Arc<dyn Processor>,
    case_store: Option<Arc<dyn CaseStore>>,
    config: OrchestratorConfig,
}

impl QueryOrchestrator {
    pub fn new(primary: Arc<dyn Processor>, secondary: Arc<dyn Processor>) -> Self {
        Self {
            primary,
            secondary,
            case_store: None,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_case_store(mut self, store: Arc<dyn CaseStore>) -> Self {
        self.case_store = Some(store);
        self
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub async fn process_legal_query(
        &self,
        context: QueryContext,
        query: &str,
        session_id: Option<&str>,
    ) -> Result<QueryOutcome, JuriError> {
        let case_id = context.case_id();
        let span = tracing::info_span!(
            "legal_query",
            case_id = case_id.as_deref().unwrap_or("-"),
            session_id = session_id.unwrap_or("-"),
        );
        match self.run(context, query, session_id).instrument(span).await {
            Ok(result) => Ok(QueryOutcome::Success(Box::new(result))),
            Err(err) if err.is_hard_failure() => Err(err),
            Err(err) => {
                tracing::warn!(
                    case_id = case_id.as_deref().unwrap_or("-"),
                    error_type = err.error_type(),
                    kind = ?err.kind(),
                    error = %err,
                    "legal query failed"
                );
                Ok(QueryOutcome::Failure(ErrorResult::from_error(&err)))
            }
        }
    }

    async fn run(
        &self,
        mut context: QueryContext,
        query: &str,
        session_id: Option<&str>,
    ) -> Result<QueryResult, JuriError> {
        let started = Instant::now();
        if context.is_empty() && !self.config.allow_empty_context {
            return Err(JuriError::EmptyContext);
        }
        let options = context.normalize()?;
        let case_id = options.case_id.as_deref();

        let details = match case_id {
            Some(case_id) => self.guard(case_id).await?,
            None => None,
        };
        if options.resume {
            if let Some(details) = &details {
                context.merge_missing(&resumable_state(details)?);
                tracing::info!(case_id = case_id.unwrap_or("-"), "resuming from persisted state");
            }
        }

        let outcome = self
            .analyse(&context, &options, query, started, session_id, details.as_ref())
            .await;
        if let (Err(_), Some(case_id)) = (&outcome, case_id) {
            self.patch_case(case_id, json!({"processing_state": {"is_processing": false}}))
                .await;
        }
        outcome
    }

    /// Advisory concurrency check: read the flag, then mark the case busy in a
    /// separate write. Two callers racing on one case can both get through.
    ///
    /// The flag is cleared only when `analyse` returns. A caller that drops
    /// the future in between leaves the case marked busy, and later queries
    /// on it fail with `already_processing` until the flag is reset.
    async fn guard(&self, case_id: &str) -> Result<Option<CaseDetails>, JuriError> {
        let Some(store) = &self.case_store else {
            return Ok(None);
        };
        let details = store.get_case_details(case_id).await?;
        if details
            .as_ref()
            .is_some_and(|details| details.processing_state.is_processing)
        {
            return Err(JuriError::AlreadyProcessing {
                case_id: case_id.to_string(),
            });
        }
        self.patch_case(
            case_id,
            json!({"processing_state": {"is_processing": true, "timeout_occurred": false}}),
        )
        .await;
        Ok(details)
    }

    async fn analyse(
        &self,
        context: &QueryContext,
        options: &QueryOptions,
        query: &str,
        started: Instant,
        session_id: Option<&str>,
        details: Option<&CaseDetails>,
    ) -> Result<QueryResult, JuriError> {
        let case_id = options.case_id.as_deref();
        let context_value = context.to_value();

        let primary_started = Instant::now();
        let primary_prompt = prompts::initial_analysis(query, options);
        let primary = if options.allow_partial_results {
            self.partial_analysis(&context_value, &primary_prompt, case_id)
                .await?
        } else if options.uses_retry_mode() {
            self.retried_analysis(&context_value, &primary_prompt, options)
                .await?
        } else {
            PrimaryAnalysis {
                text: self
                    .call(self.primary.as_ref(), &context_value, &primary_prompt, case_id)
                    .await?,
                ..PrimaryAnalysis::default()
            }
        };
        let primary_time = primary_started.elapsed();

        let secondary_started = Instant::now();
        let expert_prompt = if options.is_urgent_administrative() {
            prompts::urgent_administrative_review(query, &primary.text)
        } else {
            prompts::expert_review(query, &primary.text)
        };
        let recommendations = self
            .call(self.secondary.as_ref(), &context_value, &expert_prompt, case_id)
            .await?;
        let secondary_time = secondary_started.elapsed();

        let mut result = QueryResult {
            initial_analysis: primary.text.clone(),
            expert_recommendations: recommendations,
            timestamp: Utc::now(),
            aggregated_analysis: primary.partial_results.as_ref().map(|_| primary.text.clone()),
            partial_results: primary.partial_results,
            fallback_model_used: primary.fallback_used,
            completed_nodes: None,
            node_results: None,
            performance_metrics: None,
            current_node_result: Map::new(),
        };

        let (completed_nodes, node_results) = progress(context, &result);
        if options.resume {
            let current = context
                .get("current_node")
                .and_then(Value::as_str)
                .filter(|node| {
                    ![INITIAL_STAGE, EXPERT_STAGE].contains(node)
                        && !QueryResult::is_reserved_key(node)
                });
            if let Some(current) = current {
                if let Some(stored) = node_results.get(current) {
                    result
                        .current_node_result
                        .insert(current.to_string(), stored.clone());
                }
            }
            result.completed_nodes = Some(completed_nodes.clone());
            result.node_results = Some(node_results.clone());
        }

        if let Some(case_id) = case_id {
            let mut state = json!({
                "is_processing": false,
                "current_node": EXPERT_STAGE,
                "completed_nodes": completed_nodes,
                "node_results": node_results,
            });
            if let Some(session_id) = session_id {
                let previous = details
                    .map(|details| details.processing_state.conversation_history.clone())
                    .unwrap_or_default();
                let history =
                    self.record_turn(session_id, query, &result.expert_recommendations, previous);
                state["conversation_history"] = serde_json::to_value(history)?;
            }
            self.patch_case(case_id, json!({ "processing_state": state }))
                .await;
        }

        if options.track_performance {
            result.performance_metrics = Some(PerformanceMetrics {
                total_time: started.elapsed().as_secs_f64(),
                primary_time: primary_time.as_secs_f64(),
                secondary_time: secondary_time.as_secs_f64(),
            });
        }
        Ok(result)
    }

    /// Issues every partial call at once and keeps the successes in order.
    async fn partial_analysis(
        &self,
        context: &Value,
        prompt: &str,
        case_id: Option<&str>,
    ) -> Result<PrimaryAnalysis, JuriError> {
        let attempted = self.config.partial_result_attempts.max(1);
        let calls = (0..attempted).map(|_| self.call(self.primary.as_ref(), context, prompt, case_id));
        let mut successes = Vec::with_capacity(attempted);
        for (index, outcome) in join_all(calls).await.into_iter().enumerate() {
            match outcome {
                Ok(text) => successes.push(text),
                Err(err) => {
                    tracing::debug!(attempt = index + 1, error = %err, "partial analysis discarded")
                }
            }
        }
        if successes.is_empty() {
            return Err(JuriError::NoPartialResults { attempted });
        }
        tracing::debug!(
            succeeded = successes.len(),
            attempted = attempted,
            "partial analyses aggregated"
        );
        Ok(PrimaryAnalysis {
            text: successes.join(" "),
            partial_results: Some(successes),
            fallback_used: false,
        })
    }

    async fn retried_analysis(
        &self,
        context: &Value,
        prompt: &str,
        options: &QueryOptions,
    ) -> Result<PrimaryAnalysis, JuriError> {
        let case_id = options.case_id.as_deref();
        let policy = options
            .retry_policy()
            .with_initial_delay(self.config.initial_backoff);
        let primary = self.primary.as_ref();
        let outcome = policy
            .run(move |attempt| {
                tracing::debug!(attempt = attempt, processor = primary.name(), "primary analysis");
                self.call(primary, context, prompt, case_id)
            })
            .await;

        match outcome {
            Ok(text) => Ok(PrimaryAnalysis {
                text,
                ..PrimaryAnalysis::default()
            }),
            Err(err) if options.enable_fallback => {
                tracing::warn!(
                    error = %err,
                    fallback = self.secondary.name(),
                    "primary analysis exhausted, using fallback processor"
                );
                match self.call(self.secondary.as_ref(), context, prompt, case_id).await {
                    Ok(text) => Ok(PrimaryAnalysis {
                        text,
                        partial_results: None,
                        fallback_used: true,
                    }),
                    Err(fallback_err) => {
                        tracing::warn!(error = %fallback_err, "fallback processor failed");
                        Err(JuriError::MaxRetriesExceeded {
                            max: policy.max_attempts(),
                        })
                    }
                }
            }
            Err(err) => Err(err),
        }
    }

    /// One bounded backend call. A timeout is recorded on the case when one
    /// is known.
    async fn call(
        &self,
        processor: &dyn Processor,
        context: &Value,
        prompt: &str,
        case_id: Option<&str>,
    ) -> Result<String, JuriError> {
        let limit = self.config.backend_timeout;
        match timeout(limit, processor.generate(context, prompt)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(processor = processor.name(), timeout = ?limit, "backend call timed out");
                if let Some(case_id) = case_id {
                    self.patch_case(case_id, json!({"processing_state": {"timeout_occurred": true}}))
                        .await;
                }
                Err(JuriError::Timeout(limit))
            }
        }
    }

    fn record_turn(
        &self,
        session_id: &str,
        query: &str,
        reply: &str,
        history: Vec<HistoryEntry>,
    ) -> Vec<HistoryEntry> {
        let window = ConversationWindow::new(self.config.history_window);
        let history = window.append(session_id, Role::User, query, history);
        window.append(session_id, Role::Assistant, reply, history)
    }

    /// Best-effort write; failures are logged and swallowed.
    async fn patch_case(&self, case_id: &str, patch: Value) {
        let Some(store) = &self.case_store else {
            return;
        };
        if let Err(err) = store.update_case_details(case_id, patch).await {
            tracing::warn!(case_id = %case_id, error = %err, "failed to update case state");
        }
    }
}

/// Persisted fields a resumed query picks up.
fn resumable_state(details: &CaseDetails) -> Result<Map<String, Value>, JuriError> {
    let state = &details.processing_state;
    let mut map = Map::new();
    map.insert(
        "completed_nodes".to_string(),
        serde_json::to_value(&state.completed_nodes)?,
    );
    map.insert(
        "node_results".to_string(),
        Value::Object(state.node_results.clone()),
    );
    if let Some(current) = &state.current_node {
        map.insert("current_node".to_string(), Value::String(current.clone()));
    }
    Ok(map)
}

/// Stage list and per-stage results after this run, building on whatever
/// the context already carries.
fn progress(context: &QueryContext, result: &QueryResult) -> (Vec<String>, Map<String, Value>) {
    let mut completed: Vec<String> = context
        .get("completed_nodes")
        .and_then(Value::as_array)
        .map(|nodes| {
            nodes
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    for stage in [INITIAL_STAGE, EXPERT_STAGE] {
        if !completed.iter().any(|node| node == stage) {
            completed.push(stage.to_string());
        }
    }

    let mut results = context
        .get("node_results")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    results.insert(
        INITIAL_STAGE.to_string(),
        Value::String(result.initial_analysis.clone()),
    );
    results.insert(
        EXPERT_STAGE.to_string(),
        Value::String(result.expert_recommendations.clone()),
    );
    (completed, results)
}
