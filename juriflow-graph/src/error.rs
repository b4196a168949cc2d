use juriflow_core::JuriError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Core(#[from] JuriError),
    #[error("checkpoint failed: {0}")]
    Checkpoint(String),
    #[error("no checkpoint for thread '{thread_id}'")]
    NoCheckpoint { thread_id: String },
    #[error("max steps exceeded: reached {reached}, limit {max}")]
    MaxStepsExceeded { max: usize, reached: usize },
}
