use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use juriflow_core::{HistoryEntry, JuriError, PaymentStatus, ProcessingState, QuotaStatus};

use crate::domain::DomainSummary;
use crate::NodeId;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorEntry {
    pub node: NodeId,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentPlan {
    pub documents: Vec<String>,
    pub outline: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeneratedDocument {
    pub doc_type: String,
    pub content: String,
}

/// Caller-facing outcome written by the terminal path.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowResponse {
    Completed {
        documents: Vec<GeneratedDocument>,
        expert_guidance: Option<String>,
        review: String,
    },
    QuotaExceeded {
        required_credits: u32,
        message: String,
    },
    PaymentRequired {
        payment_details: Value,
        message: String,
    },
    SupportTicket {
        message: String,
        errors: Vec<ErrorEntry>,
    },
}

/// The unit of work every node consumes and returns.
///
/// One context belongs to exactly one in-flight run; nodes mutate it in place
/// and hand it back together with the next node to execute.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExecutionContext {
    pub user_id: String,
    pub case_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub query: String,
    /// Caller-supplied case facts (parties, claim value, dates, ...).
    #[serde(default)]
    pub case_data: Map<String, Value>,

    pub current_node: NodeId,
    #[serde(default)]
    pub completed_nodes: Vec<NodeId>,
    #[serde(default)]
    pub retry_count: BTreeMap<NodeId, u32>,

    #[serde(default)]
    pub quota_status: Option<QuotaStatus>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub input_analysis: Option<Map<String, Value>>,
    #[serde(default)]
    pub domain_summary: Option<DomainSummary>,
    #[serde(default)]
    pub research_results: Option<Value>,
    #[serde(default, alias = "expert_consultation_results")]
    pub ai_guidance: Option<String>,
    #[serde(default)]
    pub document_plan: Option<DocumentPlan>,
    #[serde(default)]
    pub generated_documents: Vec<GeneratedDocument>,
    #[serde(default)]
    pub final_review_results: Option<String>,
    #[serde(default)]
    pub response_data: Option<WorkflowResponse>,

    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
    #[serde(default)]
    pub messages: Vec<HistoryEntry>,
}

impl ExecutionContext {
    pub fn new(user_id: impl Into<String>, case_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            case_id: case_id.into(),
            organization_id: None,
            query: String::new(),
            case_data: Map::new(),
            current_node: NodeId::ENTRY,
            completed_nodes: Vec::new(),
            retry_count: BTreeMap::new(),
            quota_status: None,
            payment_status: None,
            input_analysis: None,
            domain_summary: None,
            research_results: None,
            ai_guidance: None,
            document_plan: None,
            generated_documents: Vec::new(),
            final_review_results: None,
            response_data: None,
            errors: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_case_data(mut self, case_data: Map<String, Value>) -> Self {
        self.case_data = case_data;
        self
    }

    /// Records success of `node` and names the next step.
    pub(crate) fn advance(mut self, node: NodeId, next: NodeId) -> (NodeId, Self) {
        self.completed_nodes.push(node);
        (next, self)
    }

    /// Records a recoverable failure of `node` and routes to the error node.
    pub(crate) fn fail(mut self, node: NodeId, error: &JuriError) -> (NodeId, Self) {
        tracing::warn!(node = %node, case_id = %self.case_id, error = %error, "node failed");
        self.errors.push(ErrorEntry {
            node,
            error: error.to_string(),
            timestamp: Utc::now(),
        });
        (NodeId::Error, self)
    }

    pub fn complexity_level(&self) -> u64 {
        self.input_analysis
            .as_ref()
            .and_then(|analysis| analysis.get("complexity"))
            .and_then(|complexity| complexity.get("level"))
            .and_then(Value::as_u64)
            .unwrap_or(1)
    }

    /// JSON view handed to processors as prompt context.
    pub fn prompt_context(&self) -> Value {
        let mut context = self.case_data.clone();
        if let Some(analysis) = &self.input_analysis {
            context.insert("input_analysis".to_string(), Value::Object(analysis.clone()));
        }
        if let Some(research) = &self.research_results {
            context.insert("research_results".to_string(), research.clone());
        }
        if let Some(guidance) = &self.ai_guidance {
            context.insert("ai_guidance".to_string(), Value::String(guidance.clone()));
        }
        Value::Object(context)
    }

    /// Mirror of the progress fields in the case store's shape.
    pub fn processing_state(&self) -> ProcessingState {
        ProcessingState {
            is_processing: !self.current_node.is_terminal(),
            current_node: Some(self.current_node.as_str().to_string()),
            completed_nodes: self
                .completed_nodes
                .iter()
                .map(|node| node.as_str().to_string())
                .collect(),
            retry_count: self
                .retry_count
                .iter()
                .map(|(node, count)| (node.as_str().to_string(), *count))
                .collect(),
            conversation_history: self.messages.clone(),
            ..ProcessingState::default()
        }
    }
}
