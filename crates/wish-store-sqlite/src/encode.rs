//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. UUIDs are stored as
//! hyphenated lowercase strings. Banner codes are stored as their numeric
//! code, external ids as integers.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use wish_core::{
  ids::{Uid, UserId, WishId},
  pull::{GachaType, ItemType, Pull},
  store::Account,
};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── GachaType ───────────────────────────────────────────────────────────────

pub fn decode_gacha_type(code: u16) -> Result<GachaType> {
  GachaType::from_code(code).ok_or(Error::Corrupt {
    column: "gacha_type",
    value:  code.to_string(),
  })
}

// ─── WishId ──────────────────────────────────────────────────────────────────

pub fn encode_wish_id(id: WishId) -> Result<i64> {
  i64::try_from(id.0).map_err(|_| Error::WishIdOutOfRange(id.0))
}

pub fn decode_wish_id(raw: i64) -> Result<WishId> {
  u64::try_from(raw).map(WishId).map_err(|_| Error::Corrupt {
    column: "genshin_wish_id",
    value:  raw.to_string(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column values of one `pulls` row, in insert order.
pub struct PullRow {
  pub id:              String,
  pub uid:             String,
  pub pool:            u16,
  pub order:           u32,
  pub name:            String,
  pub item_type:       String,
  pub rarity:          u8,
  pub gacha_type:      u16,
  pub time:            String,
  pub pity:            u32,
  pub was_imported:    bool,
  pub banner_id:       String,
  pub is_featured:     bool,
  pub won_fifty_fifty: bool,
  pub genshin_wish_id: Option<i64>,
}

impl PullRow {
  pub const COLUMNS: &'static str = "id, uid, pool, ord, name, item_type, rarity, \
                                     gacha_type, time, pity, was_imported, banner_id, \
                                     is_featured, won_fifty_fifty, genshin_wish_id";

  pub fn encode(pull: &Pull) -> Result<Self> {
    Ok(Self {
      id:              encode_uuid(pull.id),
      uid:             pull.uid.to_string(),
      pool:            pull.gacha_type.pool().code(),
      order:           pull.order,
      name:            pull.name.clone(),
      item_type:       pull.item_type.to_string(),
      rarity:          pull.rarity,
      gacha_type:      pull.gacha_type.code(),
      time:            encode_dt(pull.time),
      pity:            pull.pity,
      was_imported:    pull.was_imported,
      banner_id:       pull.banner_id.clone(),
      is_featured:     pull.is_featured,
      won_fifty_fifty: pull.won_fifty_fifty,
      genshin_wish_id: pull.genshin_wish_id.map(encode_wish_id).transpose()?,
    })
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      uid:             row.get(1)?,
      pool:            row.get(2)?,
      order:           row.get(3)?,
      name:            row.get(4)?,
      item_type:       row.get(5)?,
      rarity:          row.get(6)?,
      gacha_type:      row.get(7)?,
      time:            row.get(8)?,
      pity:            row.get(9)?,
      was_imported:    row.get(10)?,
      banner_id:       row.get(11)?,
      is_featured:     row.get(12)?,
      won_fifty_fifty: row.get(13)?,
      genshin_wish_id: row.get(14)?,
    })
  }

  pub fn into_pull(self) -> Result<Pull> {
    let item_type = self
      .item_type
      .parse::<ItemType>()
      .map_err(|_| Error::Corrupt { column: "item_type", value: self.item_type.clone() })?;

    Ok(Pull {
      id: decode_uuid(&self.id)?,
      uid: self.uid.parse::<Uid>()?,
      order: self.order,
      name: self.name,
      item_type,
      rarity: self.rarity,
      gacha_type: decode_gacha_type(self.gacha_type)?,
      time: decode_dt(&self.time)?,
      pity: self.pity,
      was_imported: self.was_imported,
      banner_id: self.banner_id,
      is_featured: self.is_featured,
      won_fifty_fifty: self.won_fifty_fifty,
      genshin_wish_id: self.genshin_wish_id.map(decode_wish_id).transpose()?,
    })
  }
}

/// Raw strings read directly from an `accounts` row.
pub struct RawAccount {
  pub uid:        String,
  pub user_id:    String,
  pub created_at: String,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uid:        row.get(0)?,
      user_id:    row.get(1)?,
      created_at: row.get(2)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      uid:        self.uid.parse()?,
      user_id:    UserId(self.user_id),
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
