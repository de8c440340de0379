//! Paimon.moe tracker backups.
//!
//! A backup is one JSON object holding much more than wish history; only the
//! `wish-counter-*` sections are read. Each section lists its pulls oldest
//! first.

use serde::{Deserialize, Serialize};
use wish_core::{
  ids::Uid,
  pull::{GachaType, ItemType, PullCandidate},
};

use crate::{RawCode, Result, row_error};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaimonExport {
  #[serde(rename = "wish-counter-character-event", default)]
  pub character_event: Option<PaimonCounter>,
  #[serde(rename = "wish-counter-weapon-event", default)]
  pub weapon_event:    Option<PaimonCounter>,
  #[serde(rename = "wish-counter-standard", default)]
  pub standard:        Option<PaimonCounter>,
  #[serde(rename = "wish-counter-beginners", default)]
  pub beginners:       Option<PaimonCounter>,
  #[serde(rename = "wish-counter-chronicled", default)]
  pub chronicled:      Option<PaimonCounter>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaimonCounter {
  #[serde(default)]
  pub pulls: Vec<PaimonPull>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaimonPull {
  /// `"character"` or `"weapon"`.
  #[serde(rename = "type")]
  pub item_type: String,
  /// Absent in older backups; the section then decides the banner.
  #[serde(default)]
  pub code:      Option<RawCode>,
  /// Snake_case item id, e.g. `kamisato_ayaka`.
  pub id:        String,
  /// Server-local `YYYY-MM-DD HH:mm:ss`.
  pub time:      String,
  /// The tracker's own pity count. Recomputed on merge, so never trusted.
  #[serde(default)]
  pub pity:      Option<u32>,
}

impl PaimonExport {
  /// Each section paired with the banner it implies.
  fn sections(&self) -> [(GachaType, Option<&PaimonCounter>); 5] {
    [
      (GachaType::CharacterEvent, self.character_event.as_ref()),
      (GachaType::WeaponEvent, self.weapon_event.as_ref()),
      (GachaType::Permanent, self.standard.as_ref()),
      (GachaType::Beginner, self.beginners.as_ref()),
      (GachaType::Chronicled, self.chronicled.as_ref()),
    ]
  }
}

/// The backup's pulls as candidates, newest first within each section.
pub(crate) fn candidates(export: &PaimonExport, uid: &Uid) -> Result<Vec<PullCandidate>> {
  let mut out = Vec::new();
  let mut row = 0;

  for (section, counter) in export.sections() {
    let Some(counter) = counter else { continue };
    let start = out.len();

    for pull in &counter.pulls {
      row += 1;
      let gacha_type = match &pull.code {
        Some(code) => code.gacha_type().map_err(row_error(row))?,
        None => section,
      };
      out.push(PullCandidate {
        name: pull.id.replace('_', " "),
        item_type: Some(
          pull
            .item_type
            .parse::<ItemType>()
            .map_err(|_| wish_core::Error::UnknownItemType(pull.item_type.clone()))
            .map_err(row_error(row))?,
        ),
        rarity: None,
        gacha_type,
        time: uid.parse_server_time(&pull.time).map_err(row_error(row))?,
        wish_id: None,
      });
    }

    out[start..].reverse();
  }

  Ok(out)
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{Error, ImportFormat, ImportSource};

  fn uid() -> Uid { "800000000".parse().unwrap() }

  fn backup() -> serde_json::Value {
    json!({
      "wish-counter-character-event": {
        "total": 2,
        "pulls": [
          { "type": "character", "code": "301", "id": "noelle",
            "time": "2023-01-01 12:00:00", "pity": 1 },
          { "type": "character", "code": "400", "id": "kamisato_ayaka",
            "time": "2023-01-01 12:01:00", "pity": 2 }
        ]
      },
      "wish-counter-weapon-event": {
        "pulls": [
          { "type": "weapon", "id": "cool_steel", "time": "2023-01-02 08:00:00" }
        ]
      },
      "characters": { "noelle": { "default": 1 } }
    })
  }

  #[test]
  fn sections_normalise_newest_first() {
    let source = ImportSource::from_value(ImportFormat::Paimon, backup()).unwrap();
    assert!(source.requires_history());

    let got = source.candidates(&uid()).unwrap();
    let names: Vec<&str> = got.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["kamisato ayaka", "noelle", "cool steel"]);

    assert_eq!(got[0].gacha_type, GachaType::CharacterEvent2);
    assert_eq!(got[1].gacha_type, GachaType::CharacterEvent);
    // No code: the section decides.
    assert_eq!(got[2].gacha_type, GachaType::WeaponEvent);
    assert_eq!(got[2].item_type, Some(ItemType::Weapon));
    assert!(got.iter().all(|c| c.wish_id.is_none()));
  }

  #[test]
  fn times_are_read_in_server_local_time() {
    let source = ImportSource::from_value(ImportFormat::Paimon, backup()).unwrap();
    let got = source.candidates(&uid()).unwrap();
    // UTC+8 server: 12:00 local is 04:00 UTC.
    assert_eq!(got[1].time.to_rfc3339(), "2023-01-01T04:00:00+00:00");
  }

  #[test]
  fn bad_rows_report_their_position() {
    let bad = json!({
      "wish-counter-standard": {
        "pulls": [
          { "type": "character", "id": "amber", "time": "2023-01-01 12:00:00" },
          { "type": "character", "id": "lisa", "time": "yesterday" }
        ]
      }
    });
    let source = ImportSource::from_value(ImportFormat::Paimon, bad).unwrap();
    let err = source.candidates(&uid()).unwrap_err();
    assert!(matches!(err, Error::InvalidRow { row: 2, .. }));
  }
}
