mod checkpoint;
mod config;
pub mod domain;
mod error;
mod file_checkpointer;
mod graph;
mod node;
mod nodes;
mod state;

pub use checkpoint::{
    Checkpoint, CheckpointMetadata, Checkpointer, HistoryCheckpointer, InMemoryCheckpointer,
};
pub use config::ExecutionConfig;
pub use domain::{validate_domain, DomainSummary, LegalDomain};
pub use error::GraphError;
pub use file_checkpointer::{CheckpointRecord, FileCheckpointer};
pub use graph::{LegalWorkflow, WorkflowBuilder, WorkflowServices};
pub use node::NodeId;
pub use state::{DocumentPlan, ErrorEntry, ExecutionContext, GeneratedDocument, WorkflowResponse};
