use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Checkpoint, CheckpointMetadata, Checkpointer, GraphError, HistoryCheckpointer};

/// One line of a thread's JSONL checkpoint file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub seq: u64,
    pub created_at: String,
    pub checkpoint: Checkpoint,
}

/// Appends checkpoints to `<base_dir>/<thread_id>.jsonl`.
#[derive(Clone, Debug)]
pub struct FileCheckpointer {
    base_dir: PathBuf,
}

fn io_err(err: impl ToString) -> GraphError {
    GraphError::Checkpoint(err.to_string())
}

impl FileCheckpointer {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    fn sanitize_thread_id(thread_id: &str) -> String {
        let mut out = String::with_capacity(thread_id.len());
        for ch in thread_id.chars() {
            match ch {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => out.push('_'),
                c if c.is_control() => {}
                c => out.push(c),
            }
        }
        let trimmed = out.trim_matches(|c: char| c == '.' || c.is_whitespace() || c == '_');
        if trimmed.is_empty() {
            let mut hasher = DefaultHasher::new();
            thread_id.hash(&mut hasher);
            return format!("case-{:08x}", hasher.finish());
        }
        trimmed.to_string()
    }

    fn thread_path(&self, thread_id: &str) -> PathBuf {
        self.base_dir
            .join(format!("{}.jsonl", Self::sanitize_thread_id(thread_id)))
    }

    fn read_records(&self, thread_id: &str) -> Result<Vec<CheckpointRecord>, GraphError> {
        let path = self.thread_path(thread_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path).map_err(io_err)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(io_err)?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line).map_err(io_err)?);
        }
        Ok(records)
    }
}

#[async_trait::async_trait]
impl Checkpointer for FileCheckpointer {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), GraphError> {
        fs::create_dir_all(&self.base_dir).map_err(io_err)?;

        let seq = self
            .read_records(&checkpoint.thread_id)?
            .last()
            .map(|record| record.seq + 1)
            .unwrap_or(1);
        let record = CheckpointRecord {
            seq,
            created_at: checkpoint.created_at.clone(),
            checkpoint: checkpoint.clone(),
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.thread_path(&checkpoint.thread_id))
            .map_err(io_err)?;
        let line = serde_json::to_string(&record).map_err(io_err)?;
        file.write_all(format!("{line}\n").as_bytes())
            .map_err(io_err)?;
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, GraphError> {
        Ok(self
            .read_records(thread_id)?
            .pop()
            .map(|record| record.checkpoint))
    }
}

#[async_trait::async_trait]
impl HistoryCheckpointer for FileCheckpointer {
    async fn list_checkpoints(&self, thread_id: &str) -> Result<Vec<CheckpointMetadata>, GraphError> {
        Ok(self
            .read_records(thread_id)?
            .into_iter()
            .map(|record| CheckpointMetadata {
                seq: record.seq,
                next: record.checkpoint.next,
                created_at: record.created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::FileCheckpointer;

    #[test]
    fn thread_ids_are_made_path_safe() {
        assert_eq!(FileCheckpointer::sanitize_thread_id("org/case:42"), "org_case_42");
        assert!(FileCheckpointer::sanitize_thread_id("..").starts_with("case-"));
    }
}
