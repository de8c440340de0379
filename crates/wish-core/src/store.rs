//! The `WishStore` trait and the account record it manages.
//!
//! The trait is implemented by storage backends (e.g. `wish-store-sqlite`).
//! The job layer and the HTTP surface depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  ids::{Uid, UserId, WishId},
  pull::{GachaType, Pull},
};

/// A game account linked to an application user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
  pub uid:        Uid,
  pub user_id:    UserId,
  pub created_at: DateTime<Utc>,
}

/// Abstraction over a pull-history backend.
///
/// Pulls are written a whole pity pool at a time: a merge may shift derived
/// fields of rows that were already stored, so the backend replaces the pool
/// rather than patching it.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait WishStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Link `uid` to `user_id`, creating the account if it does not exist.
  /// Relinking an existing uid to another user is an error.
  fn add_account(
    &self,
    uid: Uid,
    user_id: UserId,
  ) -> impl Future<Output = Result<Account, Self::Error>> + Send + '_;

  /// Retrieve an account by uid. Returns `None` if not found.
  fn get_account<'a>(
    &'a self,
    uid: &'a Uid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  // ── Pulls ─────────────────────────────────────────────────────────────

  /// Stored pulls for `uid`, newest first by `order`.
  ///
  /// With `gacha_type`, only that banner's pity pool is returned: asking for
  /// either character event code yields both.
  fn get_pulls<'a>(
    &'a self,
    uid: &'a Uid,
    gacha_type: Option<GachaType>,
  ) -> impl Future<Output = Result<Vec<Pull>, Self::Error>> + Send + 'a;

  /// The greatest external id stored for the pool of `gacha_type`.
  fn latest_wish_id<'a>(
    &'a self,
    uid: &'a Uid,
    gacha_type: GachaType,
  ) -> impl Future<Output = Result<Option<WishId>, Self::Error>> + Send + 'a;

  /// Atomically replace every stored pull of `pool` for `uid` with `pulls`.
  ///
  /// Either the old rows or the new rows are visible afterwards, never an
  /// empty pool.
  fn replace_pulls<'a>(
    &'a self,
    uid: &'a Uid,
    pool: GachaType,
    pulls: Vec<Pull>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
