//! Pull types: one gacha draw, as fetched, imported, or persisted.
//!
//! A persisted [`Pull`] is an immutable fact except for its derived fields
//! (`order`, `pity`, `won_fifty_fifty`), which are recomputed whenever the
//! banner group it belongs to is spliced.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  ids::{Uid, WishId},
};

// ─── GachaType ───────────────────────────────────────────────────────────────

/// The external banner code a pull was made on.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub enum GachaType {
  Beginner,
  Permanent,
  CharacterEvent,
  WeaponEvent,
  CharacterEvent2,
  Chronicled,
}

impl GachaType {
  /// Codes queried against the gacha-log API. `400` history is returned
  /// inside the `301` query.
  pub const FETCHED: [Self; 5] = [
    Self::Beginner,
    Self::Permanent,
    Self::CharacterEvent,
    Self::WeaponEvent,
    Self::Chronicled,
  ];

  pub fn code(self) -> u16 {
    match self {
      Self::Beginner => 100,
      Self::Permanent => 200,
      Self::CharacterEvent => 301,
      Self::WeaponEvent => 302,
      Self::CharacterEvent2 => 400,
      Self::Chronicled => 500,
    }
  }

  pub fn from_code(code: u16) -> Option<Self> {
    match code {
      100 => Some(Self::Beginner),
      200 => Some(Self::Permanent),
      301 => Some(Self::CharacterEvent),
      302 => Some(Self::WeaponEvent),
      400 => Some(Self::CharacterEvent2),
      500 => Some(Self::Chronicled),
      _ => None,
    }
  }

  /// The code whose pity counters this banner shares. The second character
  /// event banner shares with the first; every other code stands alone.
  pub fn pool(self) -> Self {
    match self {
      Self::CharacterEvent2 => Self::CharacterEvent,
      other => other,
    }
  }

  /// Whether a featured hit on this banner can be a won 50/50.
  pub fn has_feature_guarantee(self) -> bool {
    matches!(
      self,
      Self::CharacterEvent | Self::CharacterEvent2 | Self::WeaponEvent
    )
  }
}

impl FromStr for GachaType {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    s.trim()
      .parse::<u16>()
      .ok()
      .and_then(Self::from_code)
      .ok_or_else(|| Error::UnknownGachaType(s.to_owned()))
  }
}

impl TryFrom<String> for GachaType {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { value.parse() }
}

impl From<GachaType> for String {
  fn from(value: GachaType) -> Self { value.code().to_string() }
}

impl fmt::Display for GachaType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.code()) }
}

// ─── ItemType ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ItemType {
  Character,
  Weapon,
}

// ─── Pull ────────────────────────────────────────────────────────────────────

/// A single pull, fully classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pull {
  pub id:              Uuid,
  pub uid:             Uid,
  /// Dense 1..N index within the pull's banner group; oldest is 1.
  pub order:           u32,
  /// Canonical item name.
  pub name:            String,
  pub item_type:       ItemType,
  pub rarity:          u8,
  pub gacha_type:      GachaType,
  pub time:            DateTime<Utc>,
  /// Pulls since the previous pull of the same rarity tier, inclusive.
  /// Zero for untracked rarities.
  pub pity:            u32,
  pub was_imported:    bool,
  pub banner_id:       String,
  pub is_featured:     bool,
  pub won_fifty_fifty: bool,
  /// Present only for pulls fetched from the external API.
  pub genshin_wish_id: Option<WishId>,
}

// ─── PullCandidate ───────────────────────────────────────────────────────────

/// The format-agnostic shape every pull source is normalised to before name
/// resolution and banner classification.
#[derive(Debug, Clone, PartialEq)]
pub struct PullCandidate {
  /// The name as the source spelled it; may be noisy.
  pub name:       String,
  pub item_type:  Option<ItemType>,
  pub rarity:     Option<u8>,
  pub gacha_type: GachaType,
  pub time:       DateTime<Utc>,
  pub wish_id:    Option<WishId>,
}
