//! Keyed job table: one job per operation and user.
//!
//! ```text
//! NO_JOB ──enqueue──▶ QUEUED ──worker──▶ ACTIVE ──┬──▶ COMPLETED_RATE_LIMIT
//!    ▲                   ▲                        └──▶ FAILED
//!    │                   └────────── enqueue ─────────────┘
//!    └───── sweep, once the cool-down has passed ─────────┘
//! ```
//!
//! Enqueueing a job that is queued, running or cooling down returns its
//! current status instead of queueing a second one.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::{
  sync::{Mutex, mpsc},
  task::JoinHandle,
  time::Instant,
};
use tokio_util::sync::CancellationToken;
use wish_core::ids::{Uid, UserId};
use wish_import::ImportSource;

use crate::{
  Error, Result,
  error::FailureKind,
  status::{JobKey, JobOperation, JobStatus},
};

// ─── Config ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
  /// Cool-down after a completed job, mirroring the external rate limit.
  pub rate_limit:     Duration,
  pub sweep_interval: Duration,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self {
      rate_limit:     Duration::from_secs(3600),
      sweep_interval: Duration::from_secs(300),
    }
  }
}

// ─── Jobs ────────────────────────────────────────────────────────────────────

/// What a job does. The authkey is a credential and never logged.
#[derive(Clone)]
pub enum JobPayload {
  Fetch { uid: Uid, authkey: String },
  Import { uid: Uid, source: ImportSource },
}

impl JobPayload {
  pub fn operation(&self) -> JobOperation {
    match self {
      Self::Fetch { .. } => JobOperation::Fetch,
      Self::Import { .. } => JobOperation::Import,
    }
  }

  pub fn uid(&self) -> &Uid {
    match self {
      Self::Fetch { uid, .. } | Self::Import { uid, .. } => uid,
    }
  }
}

#[derive(Clone)]
pub struct Job {
  pub key:     JobKey,
  pub payload: JobPayload,
}

/// Receiving end of the job channel, drained by the worker pool.
pub struct JobQueue(mpsc::UnboundedReceiver<Job>);

impl JobQueue {
  pub async fn recv(&mut self) -> Option<Job> { self.0.recv().await }
}

#[derive(Debug, Clone, Copy)]
enum Entry {
  Queued,
  Active,
  Completed {
    at:       DateTime<Utc>,
    finished: Instant,
    count:    usize,
  },
  Failed {
    kind:     FailureKind,
    finished: Instant,
  },
}

impl Entry {
  fn status(&self) -> JobStatus {
    match *self {
      Self::Queued => JobStatus::QUEUED,
      Self::Active => JobStatus::ACTIVE,
      Self::Completed { at, count, .. } => JobStatus::completed(at, count),
      Self::Failed { .. } => JobStatus::FAILED,
    }
  }

  fn finished(&self) -> Option<Instant> {
    match *self {
      Self::Completed { finished, .. } | Self::Failed { finished, .. } => Some(finished),
      Self::Queued | Self::Active => None,
    }
  }
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct JobScheduler {
  state:  Arc<Mutex<HashMap<JobKey, Entry>>>,
  queue:  mpsc::UnboundedSender<Job>,
  config: SchedulerConfig,
}

impl JobScheduler {
  pub fn new(config: SchedulerConfig) -> (Self, JobQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    let scheduler = Self {
      state: Arc::new(Mutex::new(HashMap::new())),
      queue: tx,
      config,
    };
    (scheduler, JobQueue(rx))
  }

  pub fn config(&self) -> &SchedulerConfig { &self.config }

  /// Queue `payload` for `user` unless a job with the same key is pending or
  /// cooling down, in which case that job's status is returned unchanged.
  pub async fn enqueue(&self, user: UserId, payload: JobPayload) -> Result<JobStatus> {
    let key = JobKey::new(payload.operation(), user);
    let now = Instant::now();
    let mut state = self.state.lock().await;

    if let Some(entry) = state.get(&key) {
      let status = entry.status();
      let cooling = matches!(entry, Entry::Completed { finished, .. }
        if now.duration_since(*finished) < self.config.rate_limit);
      if status.is_pending() || cooling {
        tracing::debug!(job = %key, state = ?status.state, "job already known");
        return Ok(status);
      }
    }

    if let Some(Entry::Failed { kind, .. }) = state.get(&key) {
      tracing::info!(job = %key, previous = %kind, "re-queuing failed job");
    }

    let uid = payload.uid().clone();
    self
      .queue
      .send(Job { key: key.clone(), payload })
      .map_err(|_| Error::QueueClosed)?;
    state.insert(key.clone(), Entry::Queued);
    tracing::info!(job = %key, %uid, "job queued");
    Ok(JobStatus::QUEUED)
  }

  /// Current status of the job for `operation` and `user`. A completed job
  /// reads as `NO_JOB` once its cool-down has passed.
  pub async fn status(&self, operation: JobOperation, user: &UserId) -> JobStatus {
    let key = JobKey::new(operation, user.clone());
    let state = self.state.lock().await;
    match state.get(&key) {
      Some(Entry::Completed { finished, .. })
        if finished.elapsed() >= self.config.rate_limit =>
      {
        JobStatus::NO_JOB
      }
      Some(entry) => entry.status(),
      None => JobStatus::NO_JOB,
    }
  }

  pub(crate) async fn start(&self, key: &JobKey) {
    self.state.lock().await.insert(key.clone(), Entry::Active);
    tracing::info!(job = %key, "job started");
  }

  pub(crate) async fn finish(&self, key: &JobKey, outcome: Result<usize, FailureKind>) {
    let finished = Instant::now();
    let entry = match outcome {
      Ok(count) => {
        tracing::info!(job = %key, count, "job completed");
        Entry::Completed { at: Utc::now(), finished, count }
      }
      Err(kind) => {
        tracing::warn!(job = %key, %kind, "job failed");
        Entry::Failed { kind, finished }
      }
    };
    self.state.lock().await.insert(key.clone(), entry);
  }

  /// Drop finished jobs older than the cool-down. Returns how many were
  /// removed.
  pub async fn sweep(&self) -> usize {
    let window = self.config.rate_limit;
    let mut state = self.state.lock().await;
    let before = state.len();
    state.retain(|_, entry| entry.finished().is_none_or(|at| at.elapsed() < window));
    before - state.len()
  }

  /// Run [`sweep`](Self::sweep) every `sweep_interval` until `cancel` fires.
  pub fn spawn_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
    let this = self.clone();
    tokio::spawn(async move {
      let mut interval = tokio::time::interval(this.config.sweep_interval);
      interval.tick().await;
      loop {
        tokio::select! {
          () = cancel.cancelled() => break,
          _ = interval.tick() => {
            let removed = this.sweep().await;
            if removed > 0 {
              tracing::debug!(removed, "swept finished jobs");
            }
          }
        }
      }
    })
  }
}
