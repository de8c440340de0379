//! Time-windowed banner metadata.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, pull::GachaType};

/// Which slot a banner occupies. Banners of the same key type never overlap
/// in time, except the untimed `Permanent` fallback.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
pub enum BannerKeyType {
  Beginner,
  Permanent,
  CharacterEvent,
  CharacterEvent2,
  WeaponEvent,
  Chronicled,
}

impl From<GachaType> for BannerKeyType {
  fn from(gacha: GachaType) -> Self {
    match gacha {
      GachaType::Beginner => Self::Beginner,
      GachaType::Permanent => Self::Permanent,
      GachaType::CharacterEvent => Self::CharacterEvent,
      GachaType::CharacterEvent2 => Self::CharacterEvent2,
      GachaType::WeaponEvent => Self::WeaponEvent,
      GachaType::Chronicled => Self::Chronicled,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
  pub id:             String,
  #[serde(rename = "type")]
  pub key_type:       BannerKeyType,
  /// Inclusive start; `None` only for the permanent banner.
  #[serde(default)]
  pub start_duration: Option<DateTime<Utc>>,
  /// Inclusive end; `None` only for the permanent banner.
  #[serde(default)]
  pub duration:       Option<DateTime<Utc>>,
  /// Canonical names of the featured items.
  #[serde(default)]
  pub featured:       BTreeSet<String>,
  #[serde(default)]
  pub version:        String,
}

impl Banner {
  fn window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    self.start_duration.zip(self.duration)
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool {
    self
      .window()
      .is_some_and(|(start, end)| start <= at && at <= end)
  }

  pub fn is_featured(&self, name: &str) -> bool { self.featured.contains(name) }
}

/// An immutable, validated set of banners.
#[derive(Debug, Clone)]
pub struct BannerCatalog {
  banners:   Vec<Banner>,
  permanent: usize,
}

impl BannerCatalog {
  /// Validate and index `banners`.
  ///
  /// Requires exactly one `Permanent` banner, every other banner to carry a
  /// well-formed window, and no two windows of the same key type to overlap.
  pub fn new(banners: Vec<Banner>) -> Result<Self> {
    let mut permanent = None;
    for (i, banner) in banners.iter().enumerate() {
      if banner.key_type == BannerKeyType::Permanent {
        if permanent.replace(i).is_some() {
          return Err(Error::InvalidCatalog(
            "more than one Permanent banner".into(),
          ));
        }
        continue;
      }
      let Some((start, end)) = banner.window() else {
        return Err(Error::InvalidCatalog(format!(
          "banner {} has no time window",
          banner.id
        )));
      };
      if start > end {
        return Err(Error::InvalidCatalog(format!(
          "banner {} ends before it starts",
          banner.id
        )));
      }
    }

    for (i, a) in banners.iter().enumerate() {
      let Some((a_start, a_end)) = a.window() else { continue };
      for b in banners[i + 1..].iter().filter(|b| b.key_type == a.key_type) {
        let Some((b_start, b_end)) = b.window() else { continue };
        if a_start <= b_end && b_start <= a_end {
          return Err(Error::InvalidCatalog(format!(
            "banners {} and {} overlap",
            a.id, b.id
          )));
        }
      }
    }

    let permanent = permanent
      .ok_or_else(|| Error::InvalidCatalog("no Permanent banner".into()))?;
    Ok(Self { banners, permanent })
  }

  pub fn len(&self) -> usize { self.banners.len() }

  pub fn is_empty(&self) -> bool { self.banners.is_empty() }

  pub fn permanent(&self) -> &Banner { &self.banners[self.permanent] }

  /// The banner of `key_type` running at `at`, or the permanent banner.
  pub fn get_banner_from_time(&self, key_type: BannerKeyType, at: DateTime<Utc>) -> &Banner {
    self
      .banners
      .iter()
      .filter(|b| b.key_type == key_type)
      .find(|b| b.contains(at))
      .unwrap_or_else(|| self.permanent())
  }
}
