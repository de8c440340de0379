//! Pity and 50/50 recomputation for one banner group.
//!
//! Both derived fields depend on every earlier pull of the group, so they are
//! recomputed in a single oldest-to-newest pass whenever the group changes.

use crate::pull::Pull;

/// The rarities that carry a pity counter, highest first.
pub const TRACKED_RARITIES: [u8; 2] = [5, 4];

#[derive(Debug, Default, Clone, Copy)]
struct Tier {
  count:         u32,
  /// Whether the previous hit of this tier was featured; `None` before the
  /// first hit.
  last_featured: Option<bool>,
}

/// Recompute `pity` and `won_fifty_fifty` for `pulls`, which must be one
/// pity pool ordered oldest first.
///
/// A featured hit counts as a won 50/50 only on guarantee-eligible banners and
/// only if the previous hit of the same tier was featured too (a lost 50/50
/// leaves the next hit guaranteed). The first hit of a tier has no pending
/// guarantee.
pub fn recompute_pity(pulls: &mut [Pull]) {
  let mut tiers = [Tier::default(); TRACKED_RARITIES.len()];

  for pull in pulls.iter_mut() {
    for tier in &mut tiers {
      tier.count += 1;
    }

    let Some(slot) = TRACKED_RARITIES.iter().position(|&r| r == pull.rarity) else {
      pull.pity = 0;
      pull.won_fifty_fifty = false;
      continue;
    };

    let tier = &mut tiers[slot];
    pull.pity = tier.count;
    pull.won_fifty_fifty = pull.gacha_type.has_feature_guarantee()
      && pull.is_featured
      && tier.last_featured.unwrap_or(true);

    tier.count = 0;
    tier.last_featured = Some(pull.is_featured);
  }
}
