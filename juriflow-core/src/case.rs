use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{HistoryEntry, JuriError};

/// Per-case execution bookkeeping kept by the case store.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProcessingState {
    #[serde(default)]
    pub is_processing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node: Option<String>,
    #[serde(default)]
    pub completed_nodes: Vec<String>,
    #[serde(default)]
    pub node_results: Map<String, Value>,
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub retry_count: BTreeMap<String, u32>,
    #[serde(default)]
    pub timeout_occurred: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct CaseDetails {
    #[serde(default)]
    pub processing_state: ProcessingState,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Case-state persistence owned outside the orchestration core.
///
/// Patches are deep-merged: nested objects are merged key by key, any other
/// value replaces what was stored.
#[async_trait::async_trait]
pub trait CaseStore: Send + Sync {
    async fn get_case_details(&self, case_id: &str) -> Result<Option<CaseDetails>, JuriError>;

    async fn update_case_details(&self, case_id: &str, patch: Value) -> Result<(), JuriError>;

    /// Marks the case as processing and reports whether this caller won.
    ///
    /// The default is advisory: it reads, checks and writes in separate calls,
    /// so two callers racing on the same case can both observe `true`. Stores
    /// with a conditional write should override it.
    async fn try_begin_processing(&self, case_id: &str) -> Result<bool, JuriError> {
        let busy = self
            .get_case_details(case_id)
            .await?
            .is_some_and(|details| details.processing_state.is_processing);
        if busy {
            return Ok(false);
        }
        self.update_case_details(
            case_id,
            json!({"processing_state": {"is_processing": true, "completed": false}}),
        )
        .await?;
        Ok(true)
    }
}

pub fn merge_patch(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(current), Value::Object(update)) => {
            for (key, value) in update {
                match current.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        merge_patch(existing, value)
                    }
                    _ => {
                        current.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCaseStore {
    inner: Arc<RwLock<HashMap<String, Value>>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, case_id: impl Into<String>, document: Value) -> Result<(), JuriError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| JuriError::collaborator("case_store", "lock"))?;
        guard.insert(case_id.into(), document);
        Ok(())
    }

    /// Raw stored document, mostly useful for assertions.
    pub fn document(&self, case_id: &str) -> Option<Value> {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.get(case_id).cloned())
    }
}

#[async_trait::async_trait]
impl CaseStore for InMemoryCaseStore {
    async fn get_case_details(&self, case_id: &str) -> Result<Option<CaseDetails>, JuriError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| JuriError::collaborator("case_store", "lock"))?;
        guard
            .get(case_id)
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(JuriError::from)
    }

    async fn update_case_details(&self, case_id: &str, patch: Value) -> Result<(), JuriError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| JuriError::collaborator("case_store", "lock"))?;
        let document = guard
            .entry(case_id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        merge_patch(document, patch);
        Ok(())
    }

    async fn try_begin_processing(&self, case_id: &str) -> Result<bool, JuriError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| JuriError::collaborator("case_store", "lock"))?;
        let document = guard
            .entry(case_id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let busy = document
            .pointer("/processing_state/is_processing")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if busy {
            return Ok(false);
        }
        merge_patch(
            document,
            json!({"processing_state": {"is_processing": true, "completed": false}}),
        );
        Ok(true)
    }
}
