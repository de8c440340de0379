//! [`SqliteStore`], the SQLite implementation of [`WishStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use wish_core::{
  ids::{Uid, UserId, WishId},
  pull::{GachaType, Pull},
  store::{Account, WishStore},
};

use crate::{
  Error, Result,
  encode::{PullRow, RawAccount, decode_wish_id, encode_dt},
  schema::SCHEMA,
};

const SELECT_POOL: &str = "
  SELECT id, uid, pool, ord, name, item_type, rarity, gacha_type, time, pity,
         was_imported, banner_id, is_featured, won_fifty_fifty, genshin_wish_id
  FROM pulls
  WHERE uid = ?1 AND pool = ?2
  ORDER BY ord DESC";

const SELECT_ALL: &str = "
  SELECT id, uid, pool, ord, name, item_type, rarity, gacha_type, time, pity,
         was_imported, banner_id, is_featured, won_fifty_fifty, genshin_wish_id
  FROM pulls
  WHERE uid = ?1
  ORDER BY time DESC, pool, ord DESC";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A wish history store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_pulls(
    &self,
    sql: &'static str,
    uid: String,
    pool: Option<u16>,
  ) -> Result<Vec<Pull>> {
    let rows: Vec<PullRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = match pool {
          Some(pool) => stmt
            .query_map(rusqlite::params![uid, pool], PullRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
          None => stmt
            .query_map(rusqlite::params![uid], PullRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(PullRow::into_pull).collect()
  }
}

// ─── WishStore impl ──────────────────────────────────────────────────────────

impl WishStore for SqliteStore {
  type Error = Error;

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn add_account(&self, uid: Uid, user_id: UserId) -> Result<Account> {
    let uid_str  = uid.to_string();
    let user_str = user_id.as_str().to_owned();
    let at_str   = encode_dt(Utc::now());

    let raw: RawAccount = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO accounts (uid, user_id, created_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (uid) DO NOTHING",
          rusqlite::params![uid_str, user_str, at_str],
        )?;
        Ok(conn.query_row(
          "SELECT uid, user_id, created_at FROM accounts WHERE uid = ?1",
          rusqlite::params![uid_str],
          RawAccount::from_row,
        )?)
      })
      .await?;

    let account = raw.into_account()?;
    if account.user_id != user_id {
      return Err(Error::AccountOwned { uid, owner: account.user_id });
    }
    Ok(account)
  }

  async fn get_account(&self, uid: &Uid) -> Result<Option<Account>> {
    let uid_str = uid.to_string();

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT uid, user_id, created_at FROM accounts WHERE uid = ?1",
            rusqlite::params![uid_str],
            RawAccount::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawAccount::into_account).transpose()
  }

  // ── Pulls ─────────────────────────────────────────────────────────────────

  async fn get_pulls(&self, uid: &Uid, gacha_type: Option<GachaType>) -> Result<Vec<Pull>> {
    let uid_str = uid.to_string();
    match gacha_type {
      Some(gacha) => {
        self
          .query_pulls(SELECT_POOL, uid_str, Some(gacha.pool().code()))
          .await
      }
      None => self.query_pulls(SELECT_ALL, uid_str, None).await,
    }
  }

  async fn latest_wish_id(&self, uid: &Uid, gacha_type: GachaType) -> Result<Option<WishId>> {
    let uid_str = uid.to_string();
    let pool    = gacha_type.pool().code();

    let raw: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT MAX(genshin_wish_id) FROM pulls WHERE uid = ?1 AND pool = ?2",
          rusqlite::params![uid_str, pool],
          |r| r.get(0),
        )?)
      })
      .await?;

    raw.map(decode_wish_id).transpose()
  }

  async fn replace_pulls(&self, uid: &Uid, pool: GachaType, pulls: Vec<Pull>) -> Result<()> {
    let pool_code = pool.pool().code();
    let rows = pulls
      .iter()
      .map(PullRow::encode)
      .collect::<Result<Vec<_>>>()?;
    let count   = rows.len();
    let uid_str = uid.to_string();

    let known = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let known = tx
          .query_row(
            "SELECT 1 FROM accounts WHERE uid = ?1",
            rusqlite::params![uid_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !known {
          return Ok(false);
        }

        tx.execute(
          "DELETE FROM pulls WHERE uid = ?1 AND pool = ?2",
          rusqlite::params![uid_str, pool_code],
        )?;
        {
          let sql = format!(
            "INSERT INTO pulls ({}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            PullRow::COLUMNS
          );
          let mut stmt = tx.prepare(&sql)?;
          for row in &rows {
            stmt.execute(rusqlite::params![
              row.id,
              row.uid,
              row.pool,
              row.order,
              row.name,
              row.item_type,
              row.rarity,
              row.gacha_type,
              row.time,
              row.pity,
              row.was_imported,
              row.banner_id,
              row.is_featured,
              row.won_fifty_fifty,
              row.genshin_wish_id,
            ])?;
          }
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !known {
      return Err(Error::AccountNotFound(uid.clone()));
    }
    tracing::debug!(%uid, pool = %pool, count, "replaced pull group");
    Ok(())
  }
}
