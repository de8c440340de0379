//! Error type for `wish-jobs` and the coarse failure taxonomy it reports.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::status::JobOperation;

/// Why a job failed, as far as users and clients need to know.
///
/// Job status and notifications derive from the kind alone, never from the
/// underlying error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
  ExternalAuthInvalid,
  ExternalRateLimited,
  ReconciliationInvariantViolation,
  InvalidImport,
  CatalogUnavailable,
  PersistenceFailure,
  Timeout,
  Internal,
}

impl FailureKind {
  /// Localisation key of the failure notification, e.g.
  /// `wish.fetch.failed.auth`.
  pub fn message_key(self, operation: JobOperation) -> String {
    let suffix = match self {
      Self::ExternalAuthInvalid => "auth",
      Self::ExternalRateLimited => "rate_limited",
      Self::ReconciliationInvariantViolation => "cold_import",
      Self::InvalidImport => "invalid_import",
      Self::CatalogUnavailable => "not_ready",
      Self::PersistenceFailure => "persistence",
      Self::Timeout => "timeout",
      Self::Internal => "internal",
    };
    format!("wish.{operation}.failed.{suffix}")
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("fetch failed: {0}")]
  Fetch(#[from] wish_hoyolab::Error),

  #[error("import failed: {0}")]
  Import(#[from] wish_import::Error),

  #[error(transparent)]
  Core(#[from] wish_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("job exceeded {0:?}")]
  Timeout(Duration),

  #[error("job cancelled by shutdown")]
  Shutdown,

  #[error("job queue closed")]
  QueueClosed,

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self { Self::Store(Box::new(e)) }

  pub fn kind(&self) -> FailureKind {
    use wish_hoyolab::Error as Fetch;

    match self {
      Self::Fetch(Fetch::AuthInvalid { .. }) => FailureKind::ExternalAuthInvalid,
      Self::Fetch(Fetch::Core(e)) | Self::Core(e) => core_kind(e),
      Self::Fetch(e) if e.is_transient() => FailureKind::ExternalRateLimited,
      Self::Fetch(_) => FailureKind::Internal,
      Self::Import(wish_import::Error::Core(e)) => match core_kind(e) {
        FailureKind::Internal => FailureKind::InvalidImport,
        kind => kind,
      },
      Self::Import(_) => FailureKind::InvalidImport,
      Self::Store(_) => FailureKind::PersistenceFailure,
      Self::Timeout(_) => FailureKind::Timeout,
      Self::Shutdown | Self::QueueClosed => FailureKind::Internal,
      Self::Http(_) | Self::Io(_) | Self::Json(_) => FailureKind::CatalogUnavailable,
    }
  }
}

fn core_kind(e: &wish_core::Error) -> FailureKind {
  use wish_core::Error as Core;

  match e {
    Core::CatalogUnavailable | Core::InvalidCatalog(_) => FailureKind::CatalogUnavailable,
    Core::ColdImport(_) => FailureKind::ReconciliationInvariantViolation,
    Core::UnknownItem(_)
    | Core::UnknownGachaType(_)
    | Core::UnknownItemType(_)
    | Core::InvalidUid(_)
    | Core::InvalidWishId(_)
    | Core::InvalidTime(_) => FailureKind::Internal,
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
