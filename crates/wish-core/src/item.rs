//! Canonical items and the name resolver built over them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
  fuzzy::{BkTree, Levenshtein, Lookalike, MAX_DISTANCE, pascal_case},
  pull::ItemType,
};

/// A canonical catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
  /// Authoritative display spelling, e.g. `"Kamisato Ayaka"`.
  pub name:      String,
  #[serde(rename = "type")]
  pub item_type: ItemType,
  pub rarity:    u8,
}

/// Which distance a lookup should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMetric {
  Standard,
  /// Zero-cost substitution of visually similar glyphs.
  Lookalike,
}

/// A resolved item and how far the query was from it.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
  pub item:     &'a Item,
  pub distance: usize,
}

/// Fuzzy index from noisy names to canonical [`Item`]s.
///
/// Words in the tree are the PascalCase keys of the items; the side table maps
/// a key back to its item.
#[derive(Debug, Default)]
pub struct ItemIndex {
  tree:  BkTree<Levenshtein>,
  items: HashMap<String, Item>,
}

impl ItemIndex {
  pub fn new(items: impl IntoIterator<Item = Item>) -> Self {
    let mut index = Self::default();
    for item in items {
      let key = pascal_case(&item.name);
      if key.is_empty() {
        continue;
      }
      index.tree.insert(key.clone());
      index.items.entry(key).or_insert(item);
    }
    index
  }

  pub fn len(&self) -> usize { self.items.len() }

  pub fn is_empty(&self) -> bool { self.items.is_empty() }

  /// Best-effort nearest match for `raw` within [`MAX_DISTANCE`].
  pub fn resolve(&self, raw: &str, metric: NameMetric) -> Option<Resolved<'_>> {
    let hits = match metric {
      NameMetric::Standard => self.tree.search(raw, MAX_DISTANCE),
      NameMetric::Lookalike => self.tree.search_with(raw, MAX_DISTANCE, &Lookalike),
    };
    let hit = hits.into_iter().next()?;
    let item = self.items.get(&hit.word)?;
    Some(Resolved { item, distance: hit.distance })
  }
}
