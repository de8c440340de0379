//! Job identity and the status shape clients poll.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wish_core::ids::UserId;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobOperation {
  Fetch,
  Import,
}

/// One named job per operation and user. Displays as `"{operation}:{user}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
  pub operation: JobOperation,
  pub user:      UserId,
}

impl JobKey {
  pub fn new(operation: JobOperation, user: UserId) -> Self { Self { operation, user } }
}

impl fmt::Display for JobKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.operation, self.user.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
  NoJob,
  Queued,
  Active,
  CompletedRateLimit,
  Failed,
}

/// Payload of a finished job, present only while it holds the cool-down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
  /// Unix milliseconds.
  pub completed_timestamp: i64,
  /// Pulls appended to stored history.
  pub count:               usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
  pub state: JobState,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub data:  Option<JobData>,
}

impl JobStatus {
  pub const NO_JOB: Self = Self::bare(JobState::NoJob);
  pub const QUEUED: Self = Self::bare(JobState::Queued);
  pub const ACTIVE: Self = Self::bare(JobState::Active);
  pub const FAILED: Self = Self::bare(JobState::Failed);

  const fn bare(state: JobState) -> Self { Self { state, data: None } }

  pub fn completed(at: DateTime<Utc>, count: usize) -> Self {
    Self {
      state: JobState::CompletedRateLimit,
      data:  Some(JobData { completed_timestamp: at.timestamp_millis(), count }),
    }
  }

  /// Whether a worker still owns or will own this job.
  pub fn is_pending(&self) -> bool { matches!(self.state, JobState::Queued | JobState::Active) }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;

  #[test]
  fn key_reads_operation_then_user() {
    let key = JobKey::new(JobOperation::Import, UserId::new("alice"));
    assert_eq!(key.to_string(), "import:alice");
  }

  #[test]
  fn data_only_on_completed() {
    assert_eq!(serde_json::to_value(JobStatus::NO_JOB).unwrap(), json!({ "state": "NO_JOB" }));
    assert_eq!(serde_json::to_value(JobStatus::FAILED).unwrap(), json!({ "state": "FAILED" }));

    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(
      serde_json::to_value(JobStatus::completed(at, 7)).unwrap(),
      json!({
        "state": "COMPLETED_RATE_LIMIT",
        "data": { "completedTimestamp": 1_704_067_200_000_i64, "count": 7 }
      })
    );
  }
}
