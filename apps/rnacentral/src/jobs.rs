//! # Sequence Search Queue
//!
//! In-process job queue for nhmmer searches.
//!
//! Submitted queries go into a bounded channel drained by a fixed pool of
//! worker tasks. Job state lives in a `RwLock<BTreeMap>` keyed by job id.
//! Each job carries a `watch` channel; cancelling flips it, which drops the
//! running search future and with it the nhmmer child process.
//!
//! Jobs and their results are kept in memory until `expiration`, after
//! which a sweeper task removes them.

use chrono::{DateTime, NaiveDate, Utc};
use rnacentral_core::search::{JobStatus, SearchHit, parse_nhmmer_output};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command as TokioCommand;
use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Interval between sweeps for expired jobs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

// =============================================================================
// BACKEND
// =============================================================================

/// Failure of a single search.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("nhmmer exited with {status}: {stderr}")]
    Nhmmer { status: String, stderr: String },

    #[error("could not parse nhmmer output: {0}")]
    Parse(#[from] rnacentral_core::Error),
}

/// What a worker hands to the backend.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub id: Uuid,
    pub sequence: String,
    pub description: String,
}

pub type SearchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<SearchHit>, SearchError>> + Send + 'a>>;

/// Runs one search to completion. Dropping the future must abort it.
pub trait SearchBackend: Send + Sync + 'static {
    fn search<'a>(&'a self, request: &'a SearchRequest) -> SearchFuture<'a>;
}

/// Runs the nhmmer binary against a FASTA database.
#[derive(Debug, Clone)]
pub struct NhmmerBackend {
    pub binary: PathBuf,
    pub database: PathBuf,
    pub work_dir: PathBuf,
}

impl NhmmerBackend {
    async fn run(&self, request: &SearchRequest) -> Result<Vec<SearchHit>, SearchError> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let query_path = self.work_dir.join(format!("{}.fasta", request.id));
        let output_path = self.work_dir.join(format!("{}.out", request.id));
        tokio::fs::write(&query_path, format!(">query\n{}\n", request.sequence)).await?;

        debug!(job = %request.id, binary = %self.binary.display(), "Starting nhmmer");
        let output = TokioCommand::new(&self.binary)
            .arg("--notextw")
            .arg("-o")
            .arg(&output_path)
            .arg(&query_path)
            .arg(&self.database)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await;

        let _ = tokio::fs::remove_file(&query_path).await;
        let output = output?;
        if !output.status.success() {
            let _ = tokio::fs::remove_file(&output_path).await;
            return Err(SearchError::Nhmmer {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = tokio::fs::read_to_string(&output_path).await?;
        let _ = tokio::fs::remove_file(&output_path).await;
        Ok(parse_nhmmer_output(&text, request.sequence.len() as u64)?)
    }
}

impl SearchBackend for NhmmerBackend {
    fn search<'a>(&'a self, request: &'a SearchRequest) -> SearchFuture<'a> {
        Box::pin(self.run(request))
    }
}

// =============================================================================
// JOBS
// =============================================================================

/// Failure talking to the queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("job queue is full")]
    Full,

    #[error("job queue is closed")]
    Closed,

    #[error("job not found: {0}")]
    NotFound(Uuid),
}

#[derive(Debug)]
struct Job {
    request: SearchRequest,
    status: JobStatus,
    enqueued_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    expiration: DateTime<Utc>,
    results: Vec<SearchHit>,
    error: Option<String>,
    cancel: watch::Sender<bool>,
}

/// Status of a job as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub status: JobStatus,
    pub enqueued_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub expiration: DateTime<Utc>,
}

/// The submitted query of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryInfo {
    pub id: Uuid,
    pub sequence: String,
    pub length: usize,
    pub description: String,
    pub enqueued_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Submission statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub total_queries: usize,
    /// Queries per submission date.
    pub queries_per_day: BTreeMap<NaiveDate, usize>,
    pub oldest_query: Option<QueryInfo>,
}

impl Job {
    fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.request.id,
            status: self.status,
            enqueued_at: self.enqueued_at,
            ended_at: self.ended_at,
            expiration: self.expiration,
        }
    }

    fn query(&self) -> QueryInfo {
        QueryInfo {
            id: self.request.id,
            sequence: self.request.sequence.clone(),
            length: self.request.sequence.chars().count(),
            description: self.request.description.clone(),
            enqueued_at: self.enqueued_at,
            ended_at: self.ended_at,
        }
    }
}

struct Inner {
    jobs: RwLock<BTreeMap<Uuid, Job>>,
    sender: mpsc::Sender<Uuid>,
    ttl: chrono::Duration,
}

/// Handle to the search queue. Cheap to clone.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue").finish_non_exhaustive()
    }
}

impl JobQueue {
    /// Start `workers` worker tasks and the expiry sweeper on the current
    /// tokio runtime.
    pub fn start(
        backend: Arc<dyn SearchBackend>,
        workers: usize,
        capacity: usize,
        ttl: Duration,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let inner = Arc::new(Inner {
            jobs: RwLock::new(BTreeMap::new()),
            sender,
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        });
        let receiver = Arc::new(Mutex::new(receiver));

        for worker in 0..workers.max(1) {
            let inner = Arc::clone(&inner);
            let receiver = Arc::clone(&receiver);
            let backend = Arc::clone(&backend);
            tokio::spawn(async move {
                debug!(worker, "Search worker started");
                loop {
                    let next = receiver.lock().await.recv().await;
                    let Some(id) = next else { break };
                    run_job(&inner, backend.as_ref(), id).await;
                }
                debug!(worker, "Search worker stopped");
            });
        }

        let sweeper = Arc::downgrade(&inner);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                interval.tick().await;
                let Some(inner) = sweeper.upgrade() else { break };
                let removed = purge(&inner, Utc::now()).await;
                if removed > 0 {
                    info!(removed, "Expired search jobs removed");
                }
            }
        });

        Self { inner }
    }

    /// Queue a search and return its id.
    pub async fn submit(&self, sequence: &str, description: &str) -> Result<Uuid, QueueError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let (cancel, _) = watch::channel(false);
        let job = Job {
            request: SearchRequest {
                id,
                sequence: sequence.to_string(),
                description: description.to_string(),
            },
            status: JobStatus::Queued,
            enqueued_at: now,
            ended_at: None,
            expiration: now
                .checked_add_signed(self.inner.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            results: Vec::new(),
            error: None,
            cancel,
        };
        self.inner.jobs.write().await.insert(id, job);

        if let Err(e) = self.inner.sender.try_send(id) {
            self.inner.jobs.write().await.remove(&id);
            warn!(job = %id, error = %e, "Could not enqueue search");
            return Err(match e {
                mpsc::error::TrySendError::Full(_) => QueueError::Full,
                mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
            });
        }
        info!(job = %id, length = sequence.len(), "Search queued");
        Ok(id)
    }

    pub async fn status(&self, id: Uuid) -> Option<JobSnapshot> {
        self.inner.jobs.read().await.get(&id).map(Job::snapshot)
    }

    pub async fn query(&self, id: Uuid) -> Option<QueryInfo> {
        self.inner.jobs.read().await.get(&id).map(Job::query)
    }

    /// Hits of a job in output order; empty until the job finishes.
    pub async fn results(&self, id: Uuid) -> Option<Vec<SearchHit>> {
        self.inner
            .jobs
            .read()
            .await
            .get(&id)
            .map(|job| job.results.clone())
    }

    /// Error message of a failed job.
    pub async fn error(&self, id: Uuid) -> Option<String> {
        self.inner
            .jobs
            .read()
            .await
            .get(&id)
            .and_then(|job| job.error.clone())
    }

    /// Cancel a job. A running nhmmer process is killed.
    pub async fn cancel(&self, id: Uuid) -> Result<(), QueueError> {
        let mut jobs = self.inner.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(QueueError::NotFound(id))?;
        if !job.status.is_terminal() {
            job.status = JobStatus::Cancelled;
            job.ended_at = Some(Utc::now());
        }
        job.cancel.send_replace(true);
        info!(job = %id, "Search cancelled");
        Ok(())
    }

    pub async fn dashboard(&self) -> Dashboard {
        let jobs = self.inner.jobs.read().await;
        let mut queries_per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for job in jobs.values() {
            *queries_per_day
                .entry(job.enqueued_at.date_naive())
                .or_default() += 1;
        }
        Dashboard {
            total_queries: jobs.len(),
            queries_per_day,
            oldest_query: jobs.values().min_by_key(|j| j.enqueued_at).map(Job::query),
        }
    }

    /// Drop finished jobs whose expiration is before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        purge(&self.inner, now).await
    }
}

async fn purge(inner: &Inner, now: DateTime<Utc>) -> usize {
    let mut jobs = inner.jobs.write().await;
    let before = jobs.len();
    jobs.retain(|_, job| !(job.status.is_terminal() && job.expiration < now));
    before - jobs.len()
}

async fn run_job(inner: &Inner, backend: &dyn SearchBackend, id: Uuid) {
    let (request, mut cancelled) = {
        let mut jobs = inner.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return;
        };
        if job.status != JobStatus::Queued {
            return;
        }
        job.status = JobStatus::Started;
        (job.request.clone(), job.cancel.subscribe())
    };
    info!(job = %id, "Search started");

    let outcome = tokio::select! {
        result = backend.search(&request) => Some(result),
        () = async {
            let _ = cancelled.wait_for(|c| *c).await;
        } => None,
    };

    let mut jobs = inner.jobs.write().await;
    let Some(job) = jobs.get_mut(&id) else {
        return;
    };
    match outcome {
        None => debug!(job = %id, "Search aborted"),
        Some(_) if job.status == JobStatus::Cancelled => {}
        Some(Ok(hits)) => {
            info!(job = %id, hits = hits.len(), "Search finished");
            job.results = hits;
            job.status = JobStatus::Finished;
            job.ended_at = Some(Utc::now());
        }
        Some(Err(e)) => {
            error!(job = %id, error = %e, "Search failed");
            job.error = Some(e.to_string());
            job.status = JobStatus::Failed;
            job.ended_at = Some(Utc::now());
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    /// Returns one hit per query, or waits forever for `HANG` queries.
    struct FakeBackend;

    impl SearchBackend for FakeBackend {
        fn search<'a>(&'a self, request: &'a SearchRequest) -> SearchFuture<'a> {
            Box::pin(async move {
                if request.sequence.starts_with("HANG") {
                    std::future::pending::<()>().await;
                }
                if request.sequence.starts_with("FAIL") {
                    return Err(SearchError::Nhmmer {
                        status: "exit status: 1".to_string(),
                        stderr: "boom".to_string(),
                    });
                }
                Ok(vec![SearchHit {
                    result_id: 1,
                    rnacentral_id: "URS0000000001_9606".to_string(),
                    description: "test".to_string(),
                    bias: 0.0,
                    target_length: 22,
                    query_length: request.sequence.len() as u64,
                    alignment: String::new(),
                    score: 40.0,
                    e_value: 1e-10,
                    match_count: 22,
                    gap_count: 0,
                    alignment_length: 22,
                    nts_count1: 22,
                    nts_count2: 22,
                    identity: 100.0,
                    query_coverage: 100.0,
                    target_coverage: 100.0,
                    gaps: 0.0,
                }])
            })
        }
    }

    fn queue() -> JobQueue {
        JobQueue::start(Arc::new(FakeBackend), 2, 16, Duration::from_secs(3600))
    }

    async fn wait_for_status(queue: &JobQueue, id: Uuid, status: JobStatus) {
        for _ in 0..200 {
            if queue.status(id).await.map(|s| s.status) == Some(status) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} never reached {status}");
    }

    #[tokio::test]
    async fn finished_job_has_results() {
        let queue = queue();
        let id = queue.submit("ACGUACGUACGU", "test query").await.unwrap();
        wait_for_status(&queue, id, JobStatus::Finished).await;

        let results = queue.results(id).await.unwrap();
        assert_eq!(results.len(), 1);
        let status = queue.status(id).await.unwrap();
        assert!(status.ended_at.is_some());
        assert!(status.expiration > status.enqueued_at);

        let query = queue.query(id).await.unwrap();
        assert_eq!(query.length, 12);
        assert_eq!(query.description, "test query");
    }

    #[tokio::test]
    async fn failed_job_records_error() {
        let queue = queue();
        let id = queue.submit("FAILACGUACGU", "").await.unwrap();
        wait_for_status(&queue, id, JobStatus::Failed).await;
        assert!(queue.error(id).await.unwrap().contains("boom"));
        assert!(queue.results(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_stops_running_job() {
        let queue = queue();
        let id = queue.submit("HANGACGUACGU", "").await.unwrap();
        wait_for_status(&queue, id, JobStatus::Started).await;

        queue.cancel(id).await.unwrap();
        let status = queue.status(id).await.unwrap();
        assert_eq!(status.status, JobStatus::Cancelled);
        assert!(status.ended_at.is_some());

        // the worker is free again
        let next = queue.submit("ACGUACGUACGU", "").await.unwrap();
        wait_for_status(&queue, next, JobStatus::Finished).await;
        assert_eq!(queue.status(id).await.unwrap().status, JobStatus::Cancelled);
    }

    #[tokio::test]
    async fn unknown_jobs() {
        let queue = queue();
        let id = Uuid::new_v4();
        assert!(queue.status(id).await.is_none());
        assert_eq!(queue.cancel(id).await, Err(QueueError::NotFound(id)));
    }

    #[tokio::test]
    async fn dashboard_and_expiry() {
        let queue = JobQueue::start(Arc::new(FakeBackend), 1, 16, Duration::from_secs(1));
        let first = queue.submit("ACGUACGUACGU", "").await.unwrap();
        let second = queue.submit("ACGUACGUACGA", "").await.unwrap();
        wait_for_status(&queue, first, JobStatus::Finished).await;
        wait_for_status(&queue, second, JobStatus::Finished).await;

        let dashboard = queue.dashboard().await;
        assert_eq!(dashboard.total_queries, 2);
        assert_eq!(dashboard.queries_per_day.values().sum::<usize>(), 2);
        assert_eq!(dashboard.oldest_query.map(|q| q.id), Some(first));

        let later = Utc::now() + chrono::Duration::seconds(10);
        assert_eq!(queue.purge_expired(later).await, 2);
        assert!(queue.status(first).await.is_none());
    }
}
