//! Append-only job mutation log plus periodic compaction.
//!
//! Every state transition is appended as one line of JSON before the
//! owning `JobStore` method returns. `compact` rewrites a full snapshot
//! of current jobs (write-temp, fsync, rename) and truncates the log,
//! matching the atomic-replace contract used by the identity snapshot.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

use super::types::{JobLogRecord, JobStoreError};

pub struct JobLog {
    log_path: PathBuf,
    compacted_path: PathBuf,
}

impl JobLog {
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            log_path: dir.join("jobs.log"),
            compacted_path: dir.join("jobs.compact.json"),
        }
    }

    pub async fn append(&self, record: &JobLogRecord) -> Result<(), JobStoreError> {
        if let Some(parent) = self.log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await?;
        let line = serde_json::to_string(record).map_err(|e| JobStoreError::JobLogCorrupted(e.to_string()))?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Replays the compacted table, if any, then the log on top of it.
    pub async fn replay_records(&self) -> Result<Vec<JobLogRecord>, JobStoreError> {
        let mut records = Vec::new();

        if self.log_path.exists() {
            let file = tokio::fs::File::open(&self.log_path).await?;
            let mut lines = tokio::io::BufReader::new(file).lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                let record: JobLogRecord =
                    serde_json::from_str(&line).map_err(|e| JobStoreError::JobLogCorrupted(e.to_string()))?;
                records.push(record);
            }
        }

        Ok(records)
    }

    pub async fn replay_compacted(&self) -> Result<Vec<JobLogRecord>, JobStoreError> {
        if !self.compacted_path.exists() {
            return Ok(Vec::new());
        }
        let bytes = tokio::fs::read(&self.compacted_path).await?;
        serde_json::from_slice(&bytes).map_err(|e| JobStoreError::JobLogCorrupted(e.to_string()))
    }

    /// Writes the full current job table atomically, then truncates the
    /// mutation log — recovery after this point only needs the table.
    pub async fn compact(&self, jobs: &[JobLogRecord]) -> Result<(), JobStoreError> {
        if let Some(parent) = self.compacted_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = self.compacted_path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(jobs).map_err(|e| JobStoreError::JobLogCorrupted(e.to_string()))?;

        let mut tmp = tokio::fs::File::create(&tmp_path).await?;
        tmp.write_all(&bytes).await?;
        tmp.flush().await?;
        tmp.sync_all().await?;
        drop(tmp);

        tokio::fs::rename(&tmp_path, &self.compacted_path).await?;
        tokio::fs::File::create(&self.log_path).await?;
        Ok(())
    }
}
