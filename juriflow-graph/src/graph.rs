use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::Instrument;

use juriflow_core::{
    CaseStore, JuriError, LegalResearch, PaymentService, Processor, QuotaService, Role,
};
use juriflow_memory::ConversationWindow;

use crate::{
    nodes, Checkpoint, Checkpointer, ExecutionConfig, ExecutionContext, GraphError, NodeId,
    WorkflowResponse,
};

/// Collaborators every node may call.
#[derive(Clone)]
pub struct WorkflowServices {
    pub primary: Arc<dyn Processor>,
    pub secondary: Arc<dyn Processor>,
    pub quota: Arc<dyn QuotaService>,
    pub payment: Arc<dyn PaymentService>,
    pub research: Arc<dyn LegalResearch>,
}

pub struct WorkflowBuilder {
    services: WorkflowServices,
    config: ExecutionConfig,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    case_store: Option<Arc<dyn CaseStore>>,
    history: ConversationWindow,
}

impl WorkflowBuilder {
    pub fn new(services: WorkflowServices) -> Self {
        Self {
            services,
            config: ExecutionConfig::default(),
            checkpointer: None,
            case_store: None,
            history: ConversationWindow::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_checkpointer<C>(mut self, checkpointer: C) -> Self
    where
        C: Checkpointer + 'static,
    {
        self.checkpointer = Some(Arc::new(checkpointer));
        self
    }

    /// Mirrors progress into the case's `processing_state` and guards
    /// against concurrent runs on the same case.
    pub fn with_case_store(mut self, store: Arc<dyn CaseStore>) -> Self {
        self.case_store = Some(store);
        self
    }

    pub fn with_history_window(mut self, window_size: usize) -> Self {
        self.history = ConversationWindow::new(window_size);
        self
    }

    pub fn build(self) -> LegalWorkflow {
        LegalWorkflow {
            services: self.services,
            config: self.config,
            checkpointer: self.checkpointer,
            case_store: self.case_store,
            history: self.history,
        }
    }
}

/// The fixed legal-analysis workflow.
///
/// Runs start at `determine_tier` and stop when a node routes to `end`.
/// Failing nodes route to `error`, which re-dispatches them a bounded number
/// of times before ending with a support-ticket response.
pub struct LegalWorkflow {
    services: WorkflowServices,
    config: ExecutionConfig,
    checkpointer: Option<Arc<dyn Checkpointer>>,
    case_store: Option<Arc<dyn CaseStore>>,
    history: ConversationWindow,
}

impl LegalWorkflow {
    pub fn builder(services: WorkflowServices) -> WorkflowBuilder {
        WorkflowBuilder::new(services)
    }

    pub async fn invoke(&self, mut ctx: ExecutionContext) -> Result<ExecutionContext, GraphError> {
        self.acquire(&ctx.case_id).await?;
        if !ctx.query.is_empty() {
            let history = std::mem::take(&mut ctx.messages);
            ctx.messages = self
                .history
                .append(&ctx.case_id, Role::User, ctx.query.clone(), history);
        }
        ctx.current_node = NodeId::ENTRY;
        self.run_guarded(ctx, NodeId::ENTRY, 0).await
    }

    /// Starts a new turn on a case, carrying the conversation from the last
    /// checkpointed turn when there is one.
    pub async fn run_turn(
        &self,
        user_id: &str,
        case_id: &str,
        query: &str,
    ) -> Result<ExecutionContext, GraphError> {
        let previous = match &self.checkpointer {
            Some(checkpointer) => checkpointer.load(case_id).await?,
            None => None,
        };
        let mut ctx = ExecutionContext::new(user_id, case_id).with_query(query);
        if let Some(previous) = previous {
            ctx.organization_id = previous.context.organization_id;
            ctx.case_data = previous.context.case_data;
            ctx.messages = previous.context.messages;
        }
        self.invoke(ctx).await
    }

    /// Continues a thread from its latest checkpoint.
    pub async fn resume(&self, thread_id: &str) -> Result<ExecutionContext, GraphError> {
        let checkpointer = self
            .checkpointer
            .as_ref()
            .ok_or_else(|| GraphError::Checkpoint("no checkpointer configured".to_string()))?;
        let checkpoint = checkpointer
            .load(thread_id)
            .await?
            .ok_or_else(|| GraphError::NoCheckpoint {
                thread_id: thread_id.to_string(),
            })?;
        if checkpoint.next.is_terminal() {
            return Ok(checkpoint.context);
        }

        self.acquire(&checkpoint.context.case_id).await?;
        tracing::info!(thread_id = %thread_id, next = %checkpoint.next, "resuming workflow");
        self.run_guarded(checkpoint.context, checkpoint.next, checkpoint.step)
            .await
    }

    async fn run_guarded(
        &self,
        ctx: ExecutionContext,
        start: NodeId,
        step: u64,
    ) -> Result<ExecutionContext, GraphError> {
        let case_id = ctx.case_id.clone();
        let span = tracing::info_span!("legal_workflow", case_id = %case_id, user_id = %ctx.user_id);
        let result = self.run_from(ctx, start, step).instrument(span).await;
        match result {
            Ok(ctx) => Ok(self.finish(ctx).await),
            Err(err) => {
                self.release(&case_id).await;
                Err(err)
            }
        }
    }

    async fn run_from(
        &self,
        mut ctx: ExecutionContext,
        mut next: NodeId,
        mut step: u64,
    ) -> Result<ExecutionContext, GraphError> {
        let mut executed = 0usize;
        while !next.is_terminal() {
            if executed >= self.config.max_steps {
                return Err(GraphError::MaxStepsExceeded {
                    max: self.config.max_steps,
                    reached: executed,
                });
            }
            if next != NodeId::Error {
                ctx.current_node = next;
            }

            let span = tracing::info_span!("workflow_node", node = %next, step = step);
            let (following, updated) = self.dispatch(next, ctx).instrument(span).await;
            ctx = updated;
            step += 1;
            executed += 1;
            if following.is_terminal() {
                self.close(&mut ctx);
            }

            if let Some(checkpointer) = &self.checkpointer {
                let checkpoint = Checkpoint::new(ctx.case_id.clone(), ctx.clone(), step, following);
                checkpointer.save(&checkpoint).await?;
            }
            self.mirror(&ctx).await;
            next = following;
        }
        Ok(ctx)
    }

    /// Marks the run finished and records the outcome as the assistant turn,
    /// before the last checkpoint is written.
    fn close(&self, ctx: &mut ExecutionContext) {
        ctx.current_node = NodeId::End;
        if let Some(reply) = ctx.response_data.as_ref().map(response_text) {
            let history = std::mem::take(&mut ctx.messages);
            ctx.messages = self
                .history
                .append(&ctx.case_id, Role::Assistant, reply, history);
        }
    }

    async fn dispatch(&self, node: NodeId, ctx: ExecutionContext) -> (NodeId, ExecutionContext) {
        let services = &self.services;
        match node {
            NodeId::DetermineTier => nodes::determine_tier(services, ctx).await,
            NodeId::VerifyPayment => nodes::verify_payment(services, ctx).await,
            NodeId::ProcessInput => nodes::process_input(services, &self.config, ctx).await,
            NodeId::Research => nodes::research(services, ctx).await,
            NodeId::ExpertConsultation => nodes::expert_consultation(services, ctx).await,
            NodeId::DocumentPlanning => nodes::document_planning(services, ctx).await,
            NodeId::GenerateDocuments => nodes::generate_documents(services, ctx).await,
            NodeId::FinalReview => nodes::final_review(services, ctx).await,
            NodeId::Error => nodes::error_node(&self.config, ctx),
            NodeId::End => (NodeId::End, ctx),
        }
    }

    async fn acquire(&self, case_id: &str) -> Result<(), GraphError> {
        let Some(store) = &self.case_store else {
            return Ok(());
        };
        if store.try_begin_processing(case_id).await? {
            Ok(())
        } else {
            Err(JuriError::AlreadyProcessing {
                case_id: case_id.to_string(),
            }
            .into())
        }
    }

    async fn release(&self, case_id: &str) {
        let Some(store) = &self.case_store else {
            return;
        };
        let patch = json!({"processing_state": {"is_processing": false}});
        if let Err(err) = store.update_case_details(case_id, patch).await {
            tracing::warn!(case_id = %case_id, error = %err, "failed to clear processing flag");
        }
    }

    async fn mirror(&self, ctx: &ExecutionContext) {
        let Some(store) = &self.case_store else {
            return;
        };
        let state = ctx.processing_state();
        let patch = json!({"processing_state": {
            "current_node": state.current_node,
            "completed_nodes": state.completed_nodes,
            "retry_count": state.retry_count,
        }});
        if let Err(err) = store.update_case_details(&ctx.case_id, patch).await {
            tracing::warn!(case_id = %ctx.case_id, error = %err, "failed to mirror workflow progress");
        }
    }

    async fn finish(&self, ctx: ExecutionContext) -> ExecutionContext {
        if let Some(store) = &self.case_store {
            let state = ctx.processing_state();
            let patch = json!({"processing_state": {
                "is_processing": false,
                "completed": true,
                "completion_time": Utc::now(),
                "current_node": state.current_node,
                "completed_nodes": state.completed_nodes,
                "retry_count": state.retry_count,
                "conversation_history": state.conversation_history,
            }});
            if let Err(err) = store.update_case_details(&ctx.case_id, patch).await {
                tracing::warn!(case_id = %ctx.case_id, error = %err, "failed to record completion");
            }
        }
        tracing::info!(
            case_id = %ctx.case_id,
            completed_nodes = ctx.completed_nodes.len(),
            errors = ctx.errors.len(),
            "workflow finished"
        );
        ctx
    }
}

fn response_text(response: &WorkflowResponse) -> String {
    match response {
        WorkflowResponse::Completed { review, .. } => review.clone(),
        WorkflowResponse::QuotaExceeded { message, .. }
        | WorkflowResponse::PaymentRequired { message, .. }
        | WorkflowResponse::SupportTicket { message, .. } => message.clone(),
    }
}
