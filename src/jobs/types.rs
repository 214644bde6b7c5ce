//! Job, status, and error types for the persistent job store.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    OneShot,
    Interval { period_secs: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Abandoned,
}

/// Held by the worker that currently owns a `Running` job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lease {
    pub worker_id: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub kind: JobKind,
    pub payload: Vec<u8>,
    pub next_run_at: chrono::DateTime<chrono::Utc>,
    pub last_run_at: Option<chrono::DateTime<chrono::Utc>>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub status: JobStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub version: u64,
    pub lease: Option<Lease>,
}

impl Job {
    #[must_use]
    pub fn new(kind: JobKind, payload: Vec<u8>, next_run_at: chrono::DateTime<chrono::Utc>, max_attempts: u32) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: JobId::new(),
            kind,
            payload,
            next_run_at,
            last_run_at: None,
            attempts: 0,
            max_attempts: max_attempts.max(1),
            status: JobStatus::Pending,
            created_at: now,
            version: 0,
            lease: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("version conflict for job {job_id}: expected {expected}, found {actual}")]
    VersionConflict { job_id: JobId, expected: u64, actual: u64 },
    #[error("job lease expired for {0}")]
    LeaseExpired(JobId),
    #[error("job log corrupted: {0}")]
    JobLogCorrupted(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single mutation record appended to the job log. Carries enough of
/// the job to fully reconstruct it on replay; `lease` is deliberately not
/// persisted — recovery always calls `reap`, which returns any
/// apparently-`Running` job to `Pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLogRecord {
    pub job_id: JobId,
    pub kind: JobKind,
    pub payload: Vec<u8>,
    pub next_run_at: chrono::DateTime<chrono::Utc>,
    pub last_run_at: Option<chrono::DateTime<chrono::Utc>>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub status: JobStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub version: u64,
    pub checksum: u32,
}

impl JobLogRecord {
    #[must_use]
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            kind: job.kind,
            payload: job.payload.clone(),
            next_run_at: job.next_run_at,
            last_run_at: job.last_run_at,
            attempts: job.attempts,
            max_attempts: job.max_attempts,
            status: job.status,
            created_at: job.created_at,
            version: job.version,
            checksum: crc32(&job.payload),
        }
    }

    #[must_use]
    pub fn into_job(self) -> Job {
        Job {
            id: self.job_id,
            kind: self.kind,
            payload: self.payload,
            next_run_at: self.next_run_at,
            last_run_at: self.last_run_at,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            status: self.status,
            created_at: self.created_at,
            version: self.version,
            lease: None,
        }
    }

    #[must_use]
    pub fn checksum_valid(&self) -> bool {
        crc32(&self.payload) == self.checksum
    }
}

/// Small, dependency-free CRC32 used only to validate job payload
/// integrity in the log; not cryptographic.
#[must_use]
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in bytes {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}
