use std::io::Write;
use std::path::PathBuf;

use crate::agent_engine::state::ExecutionRecord;
use crate::errors::{DroidClawError, DroidClawResult};

/// Receives one record per finished run. Failures are logged by the caller
/// and never affect the run.
pub trait ExecutionSink: Send + Sync {
    fn record(&self, record: &ExecutionRecord) -> DroidClawResult<()>;
}

/// Discards every record.
#[derive(Debug, Default)]
pub struct NullSink;

impl ExecutionSink for NullSink {
    fn record(&self, _record: &ExecutionRecord) -> DroidClawResult<()> {
        Ok(())
    }
}

/// Appends each record as one JSON line.
pub struct JsonlExecutionSink {
    file_path: PathBuf,
}

impl JsonlExecutionSink {
    pub fn new(file_path: PathBuf) -> Self {
        Self { file_path }
    }

    /// `history.jsonl` under the platform data directory.
    pub fn in_data_dir() -> Self {
        Self::new(data_dir_or_cwd().join("history.jsonl"))
    }

    pub fn path(&self) -> &std::path::Path {
        &self.file_path
    }

    pub fn load_all(&self) -> DroidClawResult<Vec<ExecutionRecord>> {
        if !self.file_path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.file_path)?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| serde_json::from_str(l).map_err(DroidClawError::from))
            .collect()
    }
}

impl ExecutionSink for JsonlExecutionSink {
    fn record(&self, record: &ExecutionRecord) -> DroidClawResult<()> {
        let line = serde_json::to_string(record)?;
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DroidClawError::Persistence(format!("{}: {e}", parent.display())))?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{}", line)?;
        tracing::debug!(
            path = %self.file_path.display(),
            run = %record.id,
            "execution record flushed"
        );
        Ok(())
    }
}

/// `~/.local/share/droidclaw` (or the platform equivalent), falling back to
/// the current working directory.
fn data_dir_or_cwd() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        return data_dir.join("droidclaw");
    }
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}
