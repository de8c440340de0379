//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// The catalog has not loaded yet.
  #[error("service not ready")]
  NotReady,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("job error: {0}")]
  Jobs(#[from] wish_jobs::Error),
}

impl From<wish_core::Error> for ApiError {
  fn from(e: wish_core::Error) -> Self { Self::BadRequest(e.to_string()) }
}

impl From<wish_import::Error> for ApiError {
  fn from(e: wish_import::Error) -> Self { Self::BadRequest(e.to_string()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::NotReady => (StatusCode::SERVICE_UNAVAILABLE, self.to_string()),
      ApiError::Store(_) | ApiError::Jobs(_) => {
        tracing::error!(error = %self, "request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
