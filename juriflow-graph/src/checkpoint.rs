use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{ExecutionContext, GraphError, NodeId};

/// Snapshot taken after a node finished: the context plus the node that
/// should run next when the thread is resumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub thread_id: String,
    pub context: ExecutionContext,
    pub step: u64,
    pub next: NodeId,
    pub created_at: String,
}

impl Checkpoint {
    pub fn new(thread_id: String, context: ExecutionContext, step: u64, next: NodeId) -> Self {
        Self {
            thread_id,
            context,
            step,
            next,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

#[async_trait::async_trait]
pub trait Checkpointer: Send + Sync {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), GraphError>;
    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, GraphError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointMetadata {
    pub seq: u64,
    pub next: NodeId,
    pub created_at: String,
}

#[async_trait::async_trait]
pub trait HistoryCheckpointer: Send + Sync {
    async fn list_checkpoints(&self, thread_id: &str) -> Result<Vec<CheckpointMetadata>, GraphError>;
}

#[derive(Default, Clone)]
pub struct InMemoryCheckpointer {
    inner: Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>,
}

#[async_trait::async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), GraphError> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| GraphError::Checkpoint("lock".into()))?;
        guard
            .entry(checkpoint.thread_id.clone())
            .or_default()
            .push(checkpoint.clone());
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, GraphError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| GraphError::Checkpoint("lock".into()))?;
        Ok(guard
            .get(thread_id)
            .and_then(|history| history.last().cloned()))
    }
}

#[async_trait::async_trait]
impl HistoryCheckpointer for InMemoryCheckpointer {
    async fn list_checkpoints(&self, thread_id: &str) -> Result<Vec<CheckpointMetadata>, GraphError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| GraphError::Checkpoint("lock".into()))?;
        Ok(guard
            .get(thread_id)
            .map(|history| {
                history
                    .iter()
                    .map(|cp| CheckpointMetadata {
                        seq: cp.step,
                        next: cp.next,
                        created_at: cp.created_at.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
