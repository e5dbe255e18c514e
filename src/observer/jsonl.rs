//! JSONL run history.
//!
//! Appends one [`RunRecord`] per run to a `.jsonl` file. The file is the only
//! store; records are never rewritten.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Observer, RunContext};
use crate::domain::{EngineResult, EngineStatus};
use crate::error::{Result, SlotgrabError};

/// Serialized form of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub resource_key: String,
    pub started_at: DateTime<Utc>,
    pub release_at: DateTime<Utc>,
    pub status: EngineStatus,
    pub attempts_made: u32,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RunRecord {
    pub fn new(context: &RunContext, result: &EngineResult) -> Self {
        Self {
            run_id: context.run_id.clone(),
            resource_key: context.resource_key.clone(),
            started_at: context.started_at,
            release_at: context.release_at,
            status: result.status,
            attempts_made: result.attempts_made,
            elapsed_ms: result.elapsed.as_millis() as u64,
            confirmation: result.confirmation.as_ref().map(|c| c.as_str().to_string()),
            reason: result.reason.clone(),
        }
    }
}

/// Observer that appends run records to a JSONL file.
pub struct JsonlObserver {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlObserver {
    /// Create an observer writing to `path`. Parent directories are created
    /// on first write.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record.
    pub fn append(&self, record: &RunRecord) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| SlotgrabError::Observer(e.to_string()))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    /// Read every record back, oldest first. A missing file is empty history.
    pub fn read_all(&self) -> Result<Vec<RunRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl Observer for JsonlObserver {
    async fn report(&self, context: &RunContext, result: &EngineResult) -> Result<()> {
        let record = RunRecord::new(context, result);
        self.append(&record)?;
        tracing::debug!(run_id = %record.run_id, path = %self.path.display(), "Run recorded");
        Ok(())
    }
}
