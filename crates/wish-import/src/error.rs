//! Error types for the wish-import parsers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("export contains no pulls")]
  NoPulls,

  #[error("row {row}: {reason}")]
  InvalidRow { row: usize, reason: String },

  #[error("unknown import format: {0:?}")]
  UnknownFormat(String),

  #[error(transparent)]
  Core(#[from] wish_core::Error),

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
