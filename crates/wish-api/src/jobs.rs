//! Handlers for fetch and import jobs.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/users/{user}/wishes/fetch`  | Body: `{"uid":"800000000","authkey":"..."}` |
//! | `GET`  | `/users/{user}/wishes/fetch`  | Job status |
//! | `POST` | `/users/{user}/wishes/import` | Body: `{"uid":"...","format":"paimon","data":{...}}` |
//! | `GET`  | `/users/{user}/wishes/import` | Job status |
//!
//! Enqueueing is idempotent: a pending or cooling-down job answers with its
//! current status.

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Deserialize;
use wish_core::{
  ids::{Uid, UserId},
  store::WishStore,
};
use wish_import::{ImportFormat, ImportSource};
use wish_jobs::{JobOperation, JobPayload, JobStatus};

use crate::{ApiState, error::ApiError};

// ─── Fetch ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FetchBody {
  pub uid:     String,
  pub authkey: String,
}

/// `POST /users/{user}/wishes/fetch`
pub async fn enqueue_fetch<S>(
  State(state): State<ApiState<S>>,
  Path(user): Path<String>,
  Json(body): Json<FetchBody>,
) -> Result<Json<JobStatus>, ApiError>
where
  S: WishStore,
{
  let user = UserId::new(user);
  let uid: Uid = body.uid.parse()?;
  if body.authkey.trim().is_empty() {
    return Err(ApiError::BadRequest("authkey is empty".into()));
  }
  state.check_enqueue(&user, &uid).await?;

  let status = state
    .scheduler
    .enqueue(user, JobPayload::Fetch { uid, authkey: body.authkey })
    .await?;
  Ok(Json(status))
}

/// `GET /users/{user}/wishes/fetch`
pub async fn fetch_status<S>(
  State(state): State<ApiState<S>>,
  Path(user): Path<String>,
) -> Json<JobStatus>
where
  S: WishStore,
{
  Json(state.scheduler.status(JobOperation::Fetch, &UserId::new(user)).await)
}

// ─── Import ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ImportBody {
  pub uid:    String,
  pub format: ImportFormat,
  /// The export itself, as JSON or as a JSON-encoded string.
  pub data:   serde_json::Value,
}

/// `POST /users/{user}/wishes/import`
pub async fn enqueue_import<S>(
  State(state): State<ApiState<S>>,
  Path(user): Path<String>,
  Json(body): Json<ImportBody>,
) -> Result<Json<JobStatus>, ApiError>
where
  S: WishStore,
{
  let user = UserId::new(user);
  let uid: Uid = body.uid.parse()?;
  let source = ImportSource::from_value(body.format, body.data)?;
  state.check_enqueue(&user, &uid).await?;

  let status = state
    .scheduler
    .enqueue(user, JobPayload::Import { uid, source })
    .await?;
  Ok(Json(status))
}

/// `GET /users/{user}/wishes/import`
pub async fn import_status<S>(
  State(state): State<ApiState<S>>,
  Path(user): Path<String>,
) -> Json<JobStatus>
where
  S: WishStore,
{
  Json(state.scheduler.status(JobOperation::Import, &UserId::new(user)).await)
}

// ─── Guards ──────────────────────────────────────────────────────────────────

impl<S: WishStore> ApiState<S> {
  /// Refuse work the job would fail anyway: no catalog yet, or a uid that
  /// belongs to someone else.
  async fn check_enqueue(&self, user: &UserId, uid: &Uid) -> Result<(), ApiError> {
    if !self.catalog.is_ready() {
      return Err(ApiError::NotReady);
    }
    let account = self
      .store
      .get_account(uid)
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?;
    match account {
      Some(account) if account.user_id != *user => {
        Err(ApiError::Conflict(format!("uid {uid} is linked to another user")))
      }
      _ => Ok(()),
    }
  }
}
