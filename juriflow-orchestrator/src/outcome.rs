use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use juriflow_core::JuriError;

/// Wall-clock timings in seconds.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    pub total_time: f64,
    pub primary_time: f64,
    pub secondary_time: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    pub initial_analysis: String,
    pub expert_recommendations: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_results: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregated_analysis: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fallback_model_used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_nodes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_results: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_metrics: Option<PerformanceMetrics>,
    /// Result of the node a resumed case was parked at, keyed by that node's
    /// name.
    #[serde(flatten)]
    pub current_node_result: Map<String, Value>,
}

impl QueryResult {
    /// Serialized names of the named fields. Flattened entries must not reuse
    /// any of them.
    pub const FIELDS: &'static [&'static str] = &[
        "initial_analysis",
        "expert_recommendations",
        "timestamp",
        "partial_results",
        "aggregated_analysis",
        "fallback_model_used",
        "completed_nodes",
        "node_results",
        "performance_metrics",
    ];

    pub fn is_reserved_key(key: &str) -> bool {
        Self::FIELDS.contains(&key)
    }
}

/// Soft failure returned in place of an error.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorResult {
    pub error: String,
    pub error_type: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResult {
    pub fn from_error(error: &JuriError) -> Self {
        Self {
            error: error.to_string(),
            error_type: error.error_type().to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum QueryOutcome {
    Success(Box<QueryResult>),
    Failure(ErrorResult),
}

impl QueryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Success(_))
    }

    pub fn result(&self) -> Option<&QueryResult> {
        match self {
            QueryOutcome::Success(result) => Some(result),
            QueryOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorResult> {
        match self {
            QueryOutcome::Success(_) => None,
            QueryOutcome::Failure(error) => Some(error),
        }
    }

    pub fn to_value(&self) -> Result<Value, JuriError> {
        Ok(serde_json::to_value(self)?)
    }
}
