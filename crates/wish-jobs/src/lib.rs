//! Job layer: the keyed job table, the worker pool that drains it, the
//! service that runs one fetch or import end to end, and catalog refresh.
//!
//! ```text
//! enqueue ─▶ JobScheduler ─▶ mpsc ─▶ worker ─▶ WishService ─▶ WishStore
//!               ▲                       │
//!               └──── finish ◀──────────┴──▶ Notifier
//! ```

pub mod error;
pub mod refresh;
pub mod scheduler;
pub mod service;
pub mod status;
pub mod worker;

#[cfg(test)]
mod testing;

pub use crate::{
  error::{Error, FailureKind, Result},
  refresh::{CatalogRefresher, CatalogSource, RefreshOptions},
  scheduler::{Job, JobPayload, JobQueue, JobScheduler, SchedulerConfig},
  service::WishService,
  status::{JobKey, JobOperation, JobState, JobStatus},
  worker::{WorkerOptions, spawn_workers},
};
