//! Configuration errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("either catalog_path or catalog_url must be set")]
  MissingCatalogSource,

  #[error("page_delay_min_ms ({min}) exceeds page_delay_max_ms ({max})")]
  InvalidPageDelay { min: u64, max: u64 },
}
