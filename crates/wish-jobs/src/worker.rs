//! The worker pool draining the job queue.
//!
//! Workers take jobs in FIFO order. Jobs for different uids run in parallel;
//! jobs for the same uid (a fetch and an import, say) are serialised by a
//! per-uid lock. Every job ends in a terminal status and one notification,
//! whatever happens inside it.

use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
  sync::{Mutex, OwnedMutexGuard},
  task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use wish_core::{
  ids::{Uid, UserId},
  notify::{NotificationEvent, Notifier},
  pull::Pull,
  store::WishStore,
};
use wish_hoyolab::GachaLogApi;

use crate::{
  Error, Result,
  scheduler::{Job, JobPayload, JobQueue, JobScheduler},
  service::WishService,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerOptions {
  pub workers:     usize,
  /// Upper bound on staging one job, fetch paging included. Persisting the
  /// staged pulls is not bounded.
  pub job_timeout: Duration,
}

impl Default for WorkerOptions {
  fn default() -> Self {
    Self {
      workers:     4,
      job_timeout: Duration::from_secs(600),
    }
  }
}

/// Per-uid exclusion. Entries nobody holds are dropped on the next lookup.
#[derive(Default)]
struct UidLocks(Mutex<HashMap<Uid, Arc<Mutex<()>>>>);

impl UidLocks {
  async fn acquire(&self, uid: &Uid) -> OwnedMutexGuard<()> {
    let lock = {
      let mut locks = self.0.lock().await;
      locks.retain(|_, lock| Arc::strong_count(lock) > 1);
      locks.entry(uid.clone()).or_default().clone()
    };
    lock.lock_owned().await
  }
}

struct Shared<S, A, N> {
  queue:     Mutex<JobQueue>,
  scheduler: JobScheduler,
  service:   Arc<WishService<S, A>>,
  notifier:  Arc<N>,
  locks:     UidLocks,
  options:   WorkerOptions,
}

/// Spawn `options.workers` workers. They stop once `shutdown` fires or the
/// queue closes; a job in flight at shutdown is cancelled and marked failed.
pub fn spawn_workers<S, A, N>(
  queue: JobQueue,
  scheduler: JobScheduler,
  service: Arc<WishService<S, A>>,
  notifier: Arc<N>,
  options: WorkerOptions,
  shutdown: CancellationToken,
) -> Vec<JoinHandle<()>>
where
  S: WishStore + 'static,
  A: GachaLogApi + 'static,
  N: Notifier + 'static,
{
  let shared = Arc::new(Shared {
    queue: Mutex::new(queue),
    scheduler,
    service,
    notifier,
    locks: UidLocks::default(),
    options,
  });

  (0..options.workers.max(1))
    .map(|worker| {
      let shared = shared.clone();
      let shutdown = shutdown.clone();
      tokio::spawn(async move {
        tracing::debug!(worker, "worker started");
        loop {
          let job = tokio::select! {
            () = shutdown.cancelled() => break,
            job = async { shared.queue.lock().await.recv().await } => job,
          };
          let Some(job) = job else { break };
          shared.run(job, &shutdown).await;
        }
        tracing::debug!(worker, "worker stopped");
      })
    })
    .collect()
}

impl<S, A, N> Shared<S, A, N>
where
  S: WishStore,
  A: GachaLogApi,
  N: Notifier,
{
  async fn run(&self, job: Job, shutdown: &CancellationToken) {
    let Job { key, payload } = job;
    let _guard = self.locks.acquire(payload.uid()).await;
    self.scheduler.start(&key).await;

    // The timeout bounds staging only; once pools start being replaced the
    // job runs to completion.
    let cancel = shutdown.child_token();
    let timeout = self.options.job_timeout;
    let stage = self.stage(&key.user, &payload, &cancel);
    let outcome = match tokio::time::timeout(timeout, stage).await {
      Ok(Ok(pulls)) => self.service.persist(payload.uid(), pulls).await,
      Ok(Err(Error::Fetch(wish_hoyolab::Error::Cancelled))) if shutdown.is_cancelled() => {
        Err(Error::Shutdown)
      }
      Ok(Err(e)) => Err(e),
      Err(_) => {
        cancel.cancel();
        Err(Error::Timeout(timeout))
      }
    };

    let outcome = outcome.map_err(|e| {
      let kind = e.kind();
      tracing::warn!(job = %key, uid = %payload.uid(), %kind, error = %e, "job error");
      kind
    });
    self.scheduler.finish(&key, outcome).await;

    let event = match outcome {
      Ok(count) => NotificationEvent::WishesUpdated {
        uid: payload.uid().clone(),
        message_key: format!("wish.{}.completed", key.operation),
        count,
      },
      Err(kind) => NotificationEvent::JobFailed { message_key: kind.message_key(key.operation) },
    };
    self.notifier.notify(&key.user, event).await;
  }

  async fn stage(
    &self,
    user: &UserId,
    payload: &JobPayload,
    cancel: &CancellationToken,
  ) -> Result<Vec<Pull>> {
    match payload {
      JobPayload::Fetch { uid, authkey } => {
        self.service.fetch_pulls(user, uid, authkey, cancel).await
      }
      JobPayload::Import { uid, source } => self.service.import_pulls(user, uid, source).await,
    }
  }
}
