//! Persistent Job Store (C8): durable scheduled jobs with crash recovery
//! and idempotent re-drive.
//!
//! Every state transition is appended to the log before the owning
//! method returns. Recovery on startup is exactly: load the compacted
//! table, replay the log on top of it, then call `reap`.

mod log;
mod types;

pub use types::{Job, JobId, JobKind, JobStatus, JobStoreError, Lease};

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;

use self::log::JobLog;
use self::types::JobLogRecord;

#[derive(Debug, Clone, Copy)]
pub struct JobStoreConfig {
    pub lease_ttl: Duration,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub compaction_threshold: usize,
}

impl JobStoreConfig {
    #[must_use]
    pub const fn human() -> Self {
        Self {
            lease_ttl: Duration::from_secs(60),
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(300),
            compaction_threshold: 1000,
        }
    }

    #[must_use]
    pub const fn fast_test() -> Self {
        Self {
            lease_ttl: Duration::from_millis(50),
            backoff_base: Duration::from_millis(10),
            backoff_cap: Duration::from_millis(500),
            compaction_threshold: 16,
        }
    }
}

impl Default for JobStoreConfig {
    fn default() -> Self {
        Self::human()
    }
}

pub struct JobStore {
    config: JobStoreConfig,
    log: JobLog,
    jobs: HashMap<JobId, Job>,
    mutations_since_compaction: usize,
}

impl JobStore {
    /// Opens (or initializes) a job store backed by files under `dir`.
    /// Performs crash recovery: loads the compacted table, replays the
    /// log on top of it, then reaps expired leases.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, JobStoreError> {
        Self::open_with_config(dir, JobStoreConfig::default()).await
    }

    pub async fn open_with_config(dir: impl AsRef<Path>, config: JobStoreConfig) -> Result<Self, JobStoreError> {
        let log = JobLog::new(dir);
        let mut jobs = HashMap::new();

        for record in log.replay_compacted().await? {
            if !record.checksum_valid() {
                return Err(JobStoreError::JobLogCorrupted(format!("bad checksum for job {}", record.job_id)));
            }
            jobs.insert(record.job_id, record.into_job());
        }
        for record in log.replay_records().await? {
            if !record.checksum_valid() {
                return Err(JobStoreError::JobLogCorrupted(format!("bad checksum for job {}", record.job_id)));
            }
            jobs.insert(record.job_id, record.into_job());
        }

        let mut store = Self {
            config,
            log,
            jobs,
            mutations_since_compaction: 0,
        };
        store.reap(Utc::now()).await?;
        Ok(store)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    async fn persist(&mut self, job_id: JobId) -> Result<(), JobStoreError> {
        let job = self.jobs.get(&job_id).ok_or(JobStoreError::NotFound(job_id))?;
        self.log.append(&JobLogRecord::from_job(job)).await?;
        self.mutations_since_compaction += 1;
        if self.mutations_since_compaction >= self.config.compaction_threshold {
            self.compact().await?;
        }
        Ok(())
    }

    pub async fn compact(&mut self) -> Result<(), JobStoreError> {
        let records: Vec<_> = self.jobs.values().map(JobLogRecord::from_job).collect();
        self.log.compact(&records).await?;
        self.mutations_since_compaction = 0;
        Ok(())
    }

    pub async fn schedule(&mut self, job: Job) -> Result<JobId, JobStoreError> {
        let id = job.id;
        self.jobs.insert(id, job);
        self.persist(id).await?;
        Ok(id)
    }

    /// Returns up to `max_batch` jobs with `next_run_at <= now` and
    /// `status == Pending`, marking them `Running` under a fresh lease. A
    /// second concurrent claim sees an empty result for the same rows
    /// because this method takes `&mut self` — exactly one caller can
    /// claim at a time.
    pub async fn claim(&mut self, worker_id: &str, now: chrono::DateTime<Utc>, max_batch: usize) -> Result<Vec<Job>, JobStoreError> {
        let eligible: Vec<JobId> = self
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending && j.next_run_at <= now)
            .take(max_batch)
            .map(|j| j.id)
            .collect();

        let mut claimed = Vec::with_capacity(eligible.len());
        for id in eligible {
            if let Some(job) = self.jobs.get_mut(&id) {
                job.status = JobStatus::Running;
                job.version += 1;
                job.lease = Some(Lease {
                    worker_id: worker_id.to_string(),
                    expires_at: now + chrono::Duration::from_std(self.config.lease_ttl).unwrap_or_default(),
                });
                claimed.push(job.clone());
            }
            self.persist(id).await?;
        }
        Ok(claimed)
    }

    fn check_version(&self, job_id: JobId, version: u64) -> Result<(), JobStoreError> {
        let job = self.jobs.get(&job_id).ok_or(JobStoreError::NotFound(job_id))?;
        if job.version != version {
            return Err(JobStoreError::VersionConflict {
                job_id,
                expected: version,
                actual: job.version,
            });
        }
        Ok(())
    }

    pub async fn complete(&mut self, job_id: JobId, version: u64) -> Result<(), JobStoreError> {
        self.check_version(job_id, version)?;
        let now = Utc::now();
        {
            let job = self.jobs.get_mut(&job_id).ok_or(JobStoreError::NotFound(job_id))?;
            job.last_run_at = Some(now);
            job.lease = None;
            job.version += 1;
            job.status = match job.kind {
                JobKind::OneShot => JobStatus::Completed,
                JobKind::Interval { period_secs } => {
                    job.next_run_at = now + chrono::Duration::seconds(period_secs as i64);
                    JobStatus::Pending
                }
            };
        }
        self.persist(job_id).await
    }

    pub async fn fail(&mut self, job_id: JobId, version: u64, retryable: bool) -> Result<(), JobStoreError> {
        self.check_version(job_id, version)?;
        {
            let job = self.jobs.get_mut(&job_id).ok_or(JobStoreError::NotFound(job_id))?;
            job.attempts += 1;
            job.lease = None;
            job.version += 1;

            if retryable && job.attempts < job.max_attempts {
                let backoff_secs = self.config.backoff_base.as_secs_f64() * 2f64.powi(job.attempts as i32);
                let backoff = Duration::from_secs_f64(backoff_secs).min(self.config.backoff_cap);
                job.next_run_at = Utc::now() + chrono::Duration::from_std(backoff).unwrap_or_default();
                job.status = JobStatus::Pending;
            } else {
                job.status = JobStatus::Abandoned;
            }
        }
        self.persist(job_id).await
    }

    /// Returns expired leases to `Pending`. Idempotent; safe to call on
    /// every startup and periodically thereafter.
    pub async fn reap(&mut self, now: chrono::DateTime<Utc>) -> Result<usize, JobStoreError> {
        let expired: Vec<JobId> = self
            .jobs
            .values()
            .filter(|j| {
                j.status == JobStatus::Running
                    && j.lease.as_ref().is_none_or(|lease| lease.expires_at <= now)
            })
            .map(|j| j.id)
            .collect();

        let count = expired.len();
        for id in expired {
            if let Some(job) = self.jobs.get_mut(&id) {
                job.status = JobStatus::Pending;
                job.lease = None;
                job.version += 1;
            }
            self.persist(id).await?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (JobStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::open_with_config(dir.path(), JobStoreConfig::fast_test()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn schedule_assigns_version_zero_and_pending_status() {
        let (mut store, _dir) = store().await;
        let job = Job::new(JobKind::OneShot, vec![1, 2, 3], Utc::now(), 3);
        let id = store.schedule(job).await.unwrap();
        let stored = store.get(id).unwrap();
        assert_eq!(stored.version, 0);
        assert_eq!(stored.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn claim_marks_jobs_running_and_concurrent_claim_sees_none() {
        let (mut store, _dir) = store().await;
        let job = Job::new(JobKind::OneShot, vec![], Utc::now(), 3);
        store.schedule(job).await.unwrap();

        let now = Utc::now();
        let first = store.claim("worker-a", now, 10).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].status, JobStatus::Running);

        let second = store.claim("worker-b", now, 10).await.unwrap();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn complete_one_shot_job_marks_completed() {
        let (mut store, _dir) = store().await;
        let job = Job::new(JobKind::OneShot, vec![], Utc::now(), 3);
        let id = store.schedule(job).await.unwrap();
        let claimed = store.claim("worker-a", Utc::now(), 10).await.unwrap();
        let version = claimed[0].version;

        store.complete(id, version).await.unwrap();
        assert_eq!(store.get(id).unwrap().status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn complete_interval_job_reschedules_to_pending() {
        let (mut store, _dir) = store().await;
        let job = Job::new(JobKind::Interval { period_secs: 30 }, vec![], Utc::now(), 3);
        let id = store.schedule(job).await.unwrap();
        let claimed = store.claim("worker-a", Utc::now(), 10).await.unwrap();

        store.complete(id, claimed[0].version).await.unwrap();
        let stored = store.get(id).unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert!(stored.next_run_at > Utc::now());
    }

    #[tokio::test]
    async fn stale_version_on_complete_is_rejected() {
        let (mut store, _dir) = store().await;
        let job = Job::new(JobKind::OneShot, vec![], Utc::now(), 3);
        let id = store.schedule(job).await.unwrap();
        let claimed = store.claim("worker-a", Utc::now(), 10).await.unwrap();
        let stale_version = claimed[0].version.wrapping_sub(1);

        let err = store.complete(id, stale_version).await.unwrap_err();
        assert!(matches!(err, JobStoreError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn fail_with_retryable_schedules_backoff_until_max_attempts() {
        let (mut store, _dir) = store().await;
        let job = Job::new(JobKind::OneShot, vec![], Utc::now(), 2);
        let id = store.schedule(job).await.unwrap();

        let claimed = store.claim("worker-a", Utc::now(), 10).await.unwrap();
        store.fail(id, claimed[0].version, true).await.unwrap();
        assert_eq!(store.get(id).unwrap().status, JobStatus::Pending);

        let claimed = store.claim("worker-a", store.get(id).unwrap().next_run_at, 10).await.unwrap();
        store.fail(id, claimed[0].version, true).await.unwrap();
        assert_eq!(store.get(id).unwrap().status, JobStatus::Abandoned);
    }

    #[tokio::test]
    async fn reap_returns_expired_leases_to_pending() {
        let (mut store, _dir) = store().await;
        let job = Job::new(JobKind::OneShot, vec![], Utc::now(), 3);
        store.schedule(job).await.unwrap();
        store.claim("worker-a", Utc::now(), 10).await.unwrap();

        let later = Utc::now() + chrono::Duration::seconds(10);
        let reaped = store.reap(later).await.unwrap();
        assert_eq!(reaped, 1);
    }

    #[tokio::test]
    async fn recovery_replays_log_and_reaps_stale_leases() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let mut store = JobStore::open_with_config(dir.path(), JobStoreConfig::fast_test()).await.unwrap();
            let job = Job::new(JobKind::OneShot, vec![9, 9], Utc::now(), 3);
            let id = store.schedule(job).await.unwrap();
            store.claim("worker-a", Utc::now(), 10).await.unwrap();
            id
        };

        tokio::time::sleep(Duration::from_millis(100)).await;

        let recovered = JobStore::open_with_config(dir.path(), JobStoreConfig::fast_test()).await.unwrap();
        assert_eq!(recovered.get(id).unwrap().status, JobStatus::Pending);
    }
}
