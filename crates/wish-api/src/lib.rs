//! JSON REST API for wish history.
//!
//! Exposes an axum [`Router`] backed by any [`wish_core::store::WishStore`]
//! and a [`JobScheduler`]. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", wish_api::api_router(state))
//! ```

pub mod error;
pub mod jobs;
pub mod wishes;

use std::sync::Arc;

use axum::{Router, extract::State, http::StatusCode, routing::get};
use wish_core::{catalog::CatalogHandle, store::WishStore};
use wish_jobs::JobScheduler;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:     Arc<S>,
  pub scheduler: JobScheduler,
  pub catalog:   CatalogHandle,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:     self.store.clone(),
      scheduler: self.scheduler.clone(),
      catalog:   self.catalog.clone(),
    }
  }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: WishStore + 'static,
{
  Router::new()
    // Jobs
    .route(
      "/users/{user}/wishes/fetch",
      get(jobs::fetch_status::<S>).post(jobs::enqueue_fetch::<S>),
    )
    .route(
      "/users/{user}/wishes/import",
      get(jobs::import_status::<S>).post(jobs::enqueue_import::<S>),
    )
    // History
    .route("/uids/{uid}/wishes", get(wishes::list::<S>))
    // Readiness
    .route("/health", get(health::<S>))
    .with_state(state)
}

/// `GET /health`: 503 until the catalog has loaded.
async fn health<S>(State(state): State<ApiState<S>>) -> StatusCode {
  if state.catalog.is_ready() { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE }
}
