//! Error type for `wish-hoyolab`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The authkey is malformed, expired or belongs to another account.
  #[error("authkey rejected (retcode {retcode}): {message}")]
  AuthInvalid { retcode: i32, message: String },

  #[error("gacha-log API rate limit hit")]
  RateLimited,

  #[error("gacha-log API error (retcode {retcode}): {message}")]
  Api { retcode: i32, message: String },

  #[error("malformed gacha-log item: {0}")]
  Malformed(String),

  #[error("gacha-log API returned HTTP {0}")]
  Status(reqwest::StatusCode),

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error(transparent)]
  Core(#[from] wish_core::Error),

  #[error("fetch cancelled")]
  Cancelled,
}

impl Error {
  /// Whether another attempt may succeed.
  pub fn is_transient(&self) -> bool {
    match self {
      Self::RateLimited | Self::Http(_) => true,
      Self::Status(status) => {
        *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
      }
      Self::AuthInvalid { .. }
      | Self::Api { .. }
      | Self::Malformed(_)
      | Self::Core(_)
      | Self::Cancelled => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_throttling_and_server_faults_are_transient() {
    assert!(Error::RateLimited.is_transient());
    assert!(Error::Status(reqwest::StatusCode::BAD_GATEWAY).is_transient());
    assert!(Error::Status(reqwest::StatusCode::TOO_MANY_REQUESTS).is_transient());
    assert!(!Error::Status(reqwest::StatusCode::NOT_FOUND).is_transient());
    assert!(
      !Error::AuthInvalid { retcode: -100, message: String::new() }.is_transient()
    );
    assert!(!Error::Cancelled.is_transient());
  }
}
