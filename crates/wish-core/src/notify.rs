//! Client-facing notifications emitted by the job layer.

use std::future::Future;

use serde::Serialize;

use crate::ids::{Uid, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum NotificationEvent {
  /// Stored history changed; clients should drop cached pulls for `uid`.
  #[serde(rename_all = "camelCase")]
  WishesUpdated {
    uid:         Uid,
    message_key: String,
    count:       usize,
  },
  #[serde(rename_all = "camelCase")]
  JobFailed { message_key: String },
}

impl NotificationEvent {
  pub fn message_key(&self) -> &str {
    match self {
      Self::WishesUpdated { message_key, .. } | Self::JobFailed { message_key } => message_key,
    }
  }

  pub fn severity(&self) -> Severity {
    match self {
      Self::WishesUpdated { .. } => Severity::Success,
      Self::JobFailed { .. } => Severity::Error,
    }
  }

  pub fn count(&self) -> Option<usize> {
    match self {
      Self::WishesUpdated { count, .. } => Some(*count),
      Self::JobFailed { .. } => None,
    }
  }
}

/// Fire-and-forget delivery of [`NotificationEvent`]s to a user.
///
/// Delivery failures are the implementation's concern; nothing is returned,
/// so a failed notification can never fail the job that emitted it.
pub trait Notifier: Send + Sync {
  fn notify(
    &self,
    user: &UserId,
    event: NotificationEvent,
  ) -> impl Future<Output = ()> + Send;
}
