//! Flat exports of the official wish history.
//!
//! Rows are often typed by hand or read off screenshots, so names are noisy
//! and optional fields are frequently missing. Rows may be listed in either
//! direction.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use wish_core::{
  ids::{Uid, WishId},
  pull::{ItemType, PullCandidate},
};

use crate::{RawCode, Result, row_error};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegularRow {
  pub name:       String,
  #[serde(rename = "type", default)]
  pub item_type:  Option<String>,
  #[serde(default)]
  pub rarity:     Option<u8>,
  pub gacha_type: RawCode,
  /// Server-local `YYYY-MM-DD HH:mm:ss`.
  pub time:       String,
  /// The external id, when the row was exported from fetched history.
  #[serde(default)]
  pub id:         Option<String>,
}

pub(crate) fn candidates(rows: &[RegularRow], uid: &Uid) -> Result<Vec<PullCandidate>> {
  let mut out = rows
    .iter()
    .enumerate()
    .map(|(i, row)| candidate(row, uid).map_err(row_error(i + 1)))
    .collect::<Result<Vec<_>, _>>()?;

  if oldest_first(&out) {
    out.reverse();
  }
  Ok(out)
}

/// Rows count as newest first unless their ends say otherwise: an older
/// first timestamp or, when both ends share one second, a smaller first id.
/// A tie without ids keeps the listed order.
fn oldest_first(rows: &[PullCandidate]) -> bool {
  let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
    return false;
  };
  match first.time.cmp(&last.time) {
    Ordering::Less => true,
    Ordering::Greater => false,
    Ordering::Equal => {
      matches!((first.wish_id, last.wish_id), (Some(a), Some(b)) if a < b)
    }
  }
}

fn candidate(row: &RegularRow, uid: &Uid) -> wish_core::Result<PullCandidate> {
  let item_type = row
    .item_type
    .as_deref()
    .map(|raw| {
      raw
        .parse::<ItemType>()
        .map_err(|_| wish_core::Error::UnknownItemType(raw.to_owned()))
    })
    .transpose()?;

  Ok(PullCandidate {
    name: row.name.trim().to_owned(),
    item_type,
    rarity: row.rarity,
    gacha_type: row.gacha_type.gacha_type()?,
    time: uid.parse_server_time(&row.time)?,
    wish_id: row.id.as_deref().map(str::parse::<WishId>).transpose()?,
  })
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use wish_core::pull::GachaType;

  use super::*;
  use crate::{Error, ImportFormat, ImportSource};

  fn uid() -> Uid { "700000000".parse().unwrap() }

  fn parse(value: serde_json::Value) -> Result<Vec<PullCandidate>> {
    ImportSource::from_value(ImportFormat::Regular, value)?.candidates(&uid())
  }

  #[test]
  fn oldest_first_rows_are_reversed() {
    let got = parse(json!([
      { "name": "N0e11e", "gachaType": 200, "time": "2023-01-01 12:00:00" },
      { "name": "Cool Steel", "type": "Weapon", "rarity": 3,
        "gachaType": "200", "time": "2023-01-01 12:05:00", "id": "1650000000000000001" }
    ]))
    .unwrap();

    assert_eq!(got[0].name, "Cool Steel");
    assert_eq!(got[0].item_type, Some(ItemType::Weapon));
    assert_eq!(got[0].rarity, Some(3));
    assert_eq!(got[0].wish_id, Some(WishId(1_650_000_000_000_000_001)));
    assert_eq!(got[1].name, "N0e11e");
    assert_eq!(got[1].gacha_type, GachaType::Permanent);
  }

  #[test]
  fn newest_first_rows_keep_their_order() {
    let got = parse(json!([
      { "name": "B", "gachaType": "301", "time": "2023-01-01 12:05:00" },
      { "name": "A", "gachaType": "301", "time": "2023-01-01 12:00:00" }
    ]))
    .unwrap();
    let names: Vec<&str> = got.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["B", "A"]);
  }

  #[test]
  fn same_second_rows_are_ordered_by_id() {
    let got = parse(json!([
      { "name": "First", "gachaType": "301", "time": "2023-01-01 12:00:00",
        "id": "1650000000000000001" },
      { "name": "Second", "gachaType": "301", "time": "2023-01-01 12:00:00",
        "id": "1650000000000000002" },
      { "name": "Third", "gachaType": "301", "time": "2023-01-01 12:00:00",
        "id": "1650000000000000003" }
    ]))
    .unwrap();
    let names: Vec<&str> = got.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Third", "Second", "First"]);
  }

  #[test]
  fn same_second_rows_without_ids_read_newest_first() {
    let got = parse(json!([
      { "name": "C", "gachaType": "301", "time": "2023-01-01 12:00:00" },
      { "name": "B", "gachaType": "301", "time": "2023-01-01 12:00:00" },
      { "name": "A", "gachaType": "301", "time": "2023-01-01 12:00:00" }
    ]))
    .unwrap();
    let names: Vec<&str> = got.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["C", "B", "A"]);
  }

  #[test]
  fn europe_offset_applies() {
    let got = parse(json!([
      { "name": "Amber", "gachaType": "200", "time": "2023-06-01 01:00:00" }
    ]))
    .unwrap();
    assert_eq!(got[0].time.to_rfc3339(), "2023-06-01T00:00:00+00:00");
  }

  #[test]
  fn unknown_gacha_type_fails_with_row() {
    let err = parse(json!([
      { "name": "Amber", "gachaType": "200", "time": "2023-06-01 01:00:00" },
      { "name": "Amber", "gachaType": "999", "time": "2023-06-01 01:00:00" }
    ]))
    .unwrap_err();
    assert!(matches!(err, Error::InvalidRow { row: 2, .. }));
  }
}
