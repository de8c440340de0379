//! Error type for `wish-store-sqlite`.

use thiserror::Error;
use wish_core::ids::{Uid, UserId};

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] wish_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value no domain type accepts.
  #[error("corrupt {column} value: {value:?}")]
  Corrupt { column: &'static str, value: String },

  #[error("account not found: {0}")]
  AccountNotFound(Uid),

  #[error("uid {uid} is already linked to user {owner}")]
  AccountOwned { uid: Uid, owner: UserId },

  #[error("wish id {0} does not fit an SQLite integer")]
  WishIdOutOfRange(u64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
