//! Identifier newtypes shared across the workspace.

use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Timestamp layout used by the gacha-log API and both import formats.
pub const SERVER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── Uid ─────────────────────────────────────────────────────────────────────

/// An in-game account id. Digits only; the leading digit selects the server
/// region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
  pub fn as_str(&self) -> &str { &self.0 }

  /// The fixed offset of the server the uid lives on.
  ///
  /// `6` is America (UTC-5), `7` is Europe (UTC+1); Asia and the TW/HK/MO
  /// servers are UTC+8.
  pub fn server_offset(&self) -> FixedOffset {
    let hours = match self.0.as_bytes().first() {
      Some(b'6') => -5,
      Some(b'7') => 1,
      _ => 8,
    };
    FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix())
  }

  /// Parse a `YYYY-MM-DD HH:mm:ss` server-local timestamp into UTC.
  pub fn parse_server_time(&self, raw: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), SERVER_TIME_FORMAT)
      .map_err(|_| Error::InvalidTime(raw.to_owned()))?;
    self
      .server_offset()
      .from_local_datetime(&naive)
      .single()
      .map(|dt| dt.with_timezone(&Utc))
      .ok_or_else(|| Error::InvalidTime(raw.to_owned()))
  }
}

impl FromStr for Uid {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let s = s.trim();
    if (9..=10).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit()) {
      Ok(Self(s.to_owned()))
    } else {
      Err(Error::InvalidUid(s.to_owned()))
    }
  }
}

impl TryFrom<String> for Uid {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { value.parse() }
}

impl From<Uid> for String {
  fn from(value: Uid) -> Self { value.0 }
}

impl fmt::Display for Uid {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── UserId ──────────────────────────────────────────────────────────────────

/// The application-level user that owns one or more uids. Opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── WishId ──────────────────────────────────────────────────────────────────

/// The external API's monotonically increasing pull id.
///
/// Transported as a decimal string; compared numerically.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct WishId(pub u64);

impl FromStr for WishId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    s.trim()
      .parse::<u64>()
      .map(Self)
      .map_err(|_| Error::InvalidWishId(s.to_owned()))
  }
}

impl TryFrom<String> for WishId {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { value.parse() }
}

impl From<WishId> for String {
  fn from(value: WishId) -> Self { value.0.to_string() }
}

impl fmt::Display for WishId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
