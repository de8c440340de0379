//! Handlers for stored pull history.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/uids/{uid}/wishes` | Optional `?gacha_type=301`; newest first |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use wish_core::{
  ids::Uid,
  pull::{GachaType, Pull},
  store::WishStore,
};

use crate::{ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub gacha_type: Option<GachaType>,
}

/// `GET /uids/{uid}/wishes[?gacha_type=<code>]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Path(uid): Path<String>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Pull>>, ApiError>
where
  S: WishStore,
{
  let uid: Uid = uid.parse()?;
  let pulls = state
    .store
    .get_pulls(&uid, params.gacha_type)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(pulls))
}
