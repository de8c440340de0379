//! Catalog snapshots and the handle that swaps them.
//!
//! A [`CatalogSnapshot`] bundles the banner table and the item name index.
//! Snapshots are immutable; a refresh builds a new one and swaps it into the
//! [`CatalogHandle`] whole, so readers see either the old catalog or the new
//! one and never a mix.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  banner::{Banner, BannerCatalog, BannerKeyType},
  ids::Uid,
  item::{Item, ItemIndex, NameMetric},
  pull::{ItemType, Pull, PullCandidate},
};

// ─── Document ────────────────────────────────────────────────────────────────

/// The serialised catalog, as loaded from disk or a remote source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
  pub banners: Vec<Banner>,
  pub items:   Vec<Item>,
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// Where a pull candidate came from; decides the name metric, whether the
/// pull counts as imported and what happens when its name does not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOrigin {
  /// The gacha-log API. Its names are authoritative: an unresolved name is
  /// kept verbatim.
  Api,
  /// A Paimon.moe export; item ids are clean but not display names.
  PaimonImport,
  /// A hand-typed or OCR'd export of the official history.
  RegularImport,
}

impl PullOrigin {
  fn metric(self) -> NameMetric {
    match self {
      Self::RegularImport => NameMetric::Lookalike,
      Self::Api | Self::PaimonImport => NameMetric::Standard,
    }
  }

  fn is_import(self) -> bool { !matches!(self, Self::Api) }
}

#[derive(Debug)]
pub struct CatalogSnapshot {
  pub banners:   BannerCatalog,
  pub items:     ItemIndex,
  pub loaded_at: DateTime<Utc>,
}

impl CatalogSnapshot {
  pub fn from_document(doc: CatalogDocument) -> Result<Self> {
    if doc.items.is_empty() {
      return Err(Error::InvalidCatalog("catalog has no items".into()));
    }
    Ok(Self {
      banners:   BannerCatalog::new(doc.banners)?,
      items:     ItemIndex::new(doc.items),
      loaded_at: Utc::now(),
    })
  }

  /// Resolve the candidate's name, classify it against the banner table and
  /// produce an unordered [`Pull`]. `order`, `pity` and `won_fifty_fifty` are
  /// left for the reconciliation engine.
  ///
  /// An API candidate only takes a catalog match whose rarity and type agree
  /// with what the API reported; otherwise the API's own values stand.
  pub fn stage(&self, uid: &Uid, candidate: PullCandidate, origin: PullOrigin) -> Result<Pull> {
    let resolved = self
      .items
      .resolve(&candidate.name, origin.metric())
      .filter(|resolved| origin != PullOrigin::Api || agrees(resolved.item, &candidate));

    let (name, item_type, rarity) = match resolved {
      Some(resolved) => (
        resolved.item.name.clone(),
        resolved.item.item_type,
        resolved.item.rarity,
      ),
      None if origin == PullOrigin::Api => {
        tracing::warn!(
          name = %candidate.name,
          "item missing from catalog; keeping API spelling"
        );
        (
          candidate.name.trim().to_owned(),
          candidate.item_type.unwrap_or(ItemType::Weapon),
          candidate.rarity.unwrap_or(3),
        )
      }
      None => return Err(Error::UnknownItem(candidate.name)),
    };

    let banner = self
      .banners
      .get_banner_from_time(BannerKeyType::from(candidate.gacha_type), candidate.time);

    Ok(Pull {
      id: Uuid::new_v4(),
      uid: uid.clone(),
      order: 0,
      is_featured: banner.is_featured(&name),
      banner_id: banner.id.clone(),
      name,
      item_type,
      rarity,
      gacha_type: candidate.gacha_type,
      time: candidate.time,
      pity: 0,
      was_imported: origin.is_import(),
      won_fifty_fifty: false,
      genshin_wish_id: candidate.wish_id,
    })
  }
}

fn agrees(item: &Item, candidate: &PullCandidate) -> bool {
  candidate.rarity.is_none_or(|rarity| rarity == item.rarity)
    && candidate.item_type.is_none_or(|item_type| item_type == item.item_type)
}

// ─── Handle ──────────────────────────────────────────────────────────────────

/// Shared, atomically swappable reference to the current catalog.
///
/// Cloning is cheap. Readers take an `Arc` to the snapshot and never hold the
/// lock beyond that.
#[derive(Debug, Clone, Default)]
pub struct CatalogHandle {
  current: Arc<RwLock<Option<Arc<CatalogSnapshot>>>>,
}

impl CatalogHandle {
  pub fn new() -> Self { Self::default() }

  /// A handle that starts out holding `snapshot`.
  pub fn with_snapshot(snapshot: CatalogSnapshot) -> Self {
    let handle = Self::new();
    handle.replace(snapshot);
    handle
  }

  /// The current snapshot, or [`Error::CatalogUnavailable`] before the first
  /// successful load.
  pub fn snapshot(&self) -> Result<Arc<CatalogSnapshot>> {
    let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
    guard.clone().ok_or(Error::CatalogUnavailable)
  }

  pub fn is_ready(&self) -> bool { self.snapshot().is_ok() }

  /// Swap in a freshly built snapshot.
  pub fn replace(&self, snapshot: CatalogSnapshot) {
    let next = Arc::new(snapshot);
    let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
    *guard = Some(next);
  }
}
