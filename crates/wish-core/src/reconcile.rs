//! Merge freshly observed pulls into stored history.
//!
//! Pipeline, per pity pool:
//!   new pulls (newest first) + stored pulls (newest first)
//!     └─ reverse new pulls             → oldest first
//!          └─ locate the splice point  → first pull not already stored
//!               └─ append the tail     → combined, oldest first
//!                    └─ dense `order`, recompute pity over the whole group
//!
//! The result always replaces the whole stored group: splicing can move a
//! pity window, so rows that were already stored may change.

use std::collections::{BTreeMap, HashSet};

use crate::{
  pity::recompute_pity,
  pull::{GachaType, Pull},
};

/// The authoritative sequence for one pity pool after a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
  /// Oldest first, `order` dense from 1.
  pub pulls:    Vec<Pull>,
  /// How many pulls were added on top of the stored history.
  pub appended: usize,
}

impl Merge {
  pub fn is_unchanged(&self) -> bool { self.appended == 0 }
}

/// Split pulls into pity pools, preserving their relative order.
pub fn group_by_pool(pulls: Vec<Pull>) -> BTreeMap<GachaType, Vec<Pull>> {
  let mut groups: BTreeMap<GachaType, Vec<Pull>> = BTreeMap::new();
  for pull in pulls {
    groups.entry(pull.gacha_type.pool()).or_default().push(pull);
  }
  groups
}

/// Merge `new_pulls` (any pools, newest first) into `current` (keyed by pool,
/// each newest first). Only pools that received new pulls are returned.
pub fn reconcile(
  new_pulls: Vec<Pull>,
  mut current: BTreeMap<GachaType, Vec<Pull>>,
) -> BTreeMap<GachaType, Merge> {
  group_by_pool(new_pulls)
    .into_iter()
    .map(|(pool, fresh)| {
      let stored = current.remove(&pool).unwrap_or_default();
      (pool, merge(fresh, stored))
    })
    .collect()
}

/// Merge one pool. `new_pulls` and `current_pulls` are both newest first.
pub fn merge(mut new_pulls: Vec<Pull>, current_pulls: Vec<Pull>) -> Merge {
  if new_pulls.is_empty() {
    let mut pulls = current_pulls;
    pulls.reverse();
    return Merge { pulls, appended: 0 };
  }

  new_pulls.reverse();

  let Some(anchor) = current_pulls.first() else {
    return finish(new_pulls, 0);
  };

  let splice = splice_point(&new_pulls, &current_pulls);
  let stored_ids: HashSet<_> = current_pulls
    .iter()
    .filter_map(|p| p.genshin_wish_id)
    .collect();

  let fresh: Vec<Pull> = new_pulls
    .split_off(splice)
    .into_iter()
    .filter(|p| p.genshin_wish_id.is_none_or(|id| !stored_ids.contains(&id)))
    .collect();

  tracing::debug!(
    anchor = %anchor.time,
    splice,
    appended = fresh.len(),
    "spliced pull history"
  );

  let mut pulls = current_pulls;
  pulls.reverse();
  let stored = pulls.len();
  pulls.extend(fresh);
  finish(pulls, stored)
}

/// Index into `new_pulls` (oldest first) of the first pull that is not yet
/// stored. `current` is newest first and non-empty.
///
/// The anchor is the newest stored pull. Fetched pulls older than it are
/// already stored. If nothing fetched shares the anchor's timestamp there is a
/// gap and everything from that point is new. Otherwise, since several pulls
/// may share one timestamp, the run of ties is searched for the anchor itself:
/// same name, with the fetched pull before it matching the second-newest
/// stored pull. Without such a match the whole run is treated as stored.
fn splice_point(new_pulls: &[Pull], current: &[Pull]) -> usize {
  let anchor = &current[0];
  let second = current.get(1);

  let Some(start) = new_pulls.iter().position(|p| p.time >= anchor.time) else {
    return new_pulls.len();
  };
  if new_pulls[start].time > anchor.time {
    return start;
  }

  let mut run_end = start;
  for (i, pull) in new_pulls.iter().enumerate().skip(start) {
    if pull.time != anchor.time {
      break;
    }
    run_end = i + 1;

    let lines_up = match (second, i.checked_sub(1)) {
      (Some(second), Some(prev)) => new_pulls[prev].name == second.name,
      (Some(_), None) => false,
      (None, _) => true,
    };
    if pull.name == anchor.name && lines_up {
      return i + 1;
    }
  }
  run_end
}

fn finish(mut pulls: Vec<Pull>, stored: usize) -> Merge {
  for (i, pull) in pulls.iter_mut().enumerate() {
    pull.order = u32::try_from(i + 1).unwrap_or(u32::MAX);
  }
  recompute_pity(&mut pulls);
  let appended = pulls.len() - stored;
  Merge { pulls, appended }
}
