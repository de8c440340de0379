//! Error types for `wish-core`.

use thiserror::Error;

use crate::ids::Uid;

#[derive(Debug, Error)]
pub enum Error {
  /// No catalog snapshot has been loaded yet.
  #[error("catalog not initialised")]
  CatalogUnavailable,

  #[error("invalid catalog: {0}")]
  InvalidCatalog(String),

  #[error("no catalog item matches {0:?}")]
  UnknownItem(String),

  #[error("unknown gacha type: {0:?}")]
  UnknownGachaType(String),

  #[error("unknown item type: {0:?}")]
  UnknownItemType(String),

  #[error("invalid uid: {0:?}")]
  InvalidUid(String),

  #[error("invalid wish id: {0:?}")]
  InvalidWishId(String),

  #[error("invalid timestamp: {0:?}")]
  InvalidTime(String),

  /// A Paimon-format import was attempted for a uid with no stored history.
  #[error("uid {0} has no stored history; import the official export first")]
  ColdImport(Uid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
