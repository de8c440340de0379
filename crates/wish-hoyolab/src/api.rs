//! Wire types of the gacha-log endpoint and the [`GachaLogApi`] seam.

use std::future::Future;

use serde::{Deserialize, Serialize};
use wish_core::{
  ids::{Uid, WishId},
  pull::{GachaType, ItemType, PullCandidate},
};

use crate::{Error, Result};

/// Items per page. The endpoint caps it at 20.
pub const PAGE_SIZE: u32 = 20;

const RETCODE_AUTHKEY_INVALID: i32 = -100;
const RETCODE_AUTHKEY_TIMEOUT: i32 = -101;
const RETCODE_VISIT_TOO_FREQUENTLY: i32 = -110;

// ─── Request ─────────────────────────────────────────────────────────────────

/// One page query. Pages walk backward in time: `end_id` is the id of the last
/// item of the previous page, `0` for the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
  pub authkey:    String,
  pub gacha_type: GachaType,
  /// 1-based.
  pub page:       u32,
  pub end_id:     WishId,
}

impl PageRequest {
  pub fn first(authkey: impl Into<String>, gacha_type: GachaType) -> Self {
    Self {
      authkey: authkey.into(),
      gacha_type,
      page: 1,
      end_id: WishId(0),
    }
  }

  /// The request for the page after one that ended with `last`.
  pub fn next(&self, last: WishId) -> Self {
    Self {
      page: self.page + 1,
      end_id: last,
      ..self.clone()
    }
  }
}

// ─── Response ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct GachaLogResponse {
  pub retcode: i32,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub data:    Option<GachaLogPage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GachaLogPage {
  #[serde(default)]
  pub list: Vec<GachaLogItem>,
}

/// One raw item. Every field is transported as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GachaLogItem {
  #[serde(default)]
  pub uid:        String,
  pub gacha_type: String,
  #[serde(default)]
  pub item_id:    String,
  #[serde(default)]
  pub count:      String,
  /// Server-local `YYYY-MM-DD HH:mm:ss`.
  pub time:       String,
  pub name:       String,
  #[serde(default)]
  pub lang:       String,
  pub item_type:  String,
  pub rank_type:  String,
  pub id:         String,
}

impl GachaLogResponse {
  /// Map `retcode` onto the error taxonomy and unwrap the page's items.
  pub fn into_items(self) -> Result<Vec<GachaLogItem>> {
    match self.retcode {
      0 => Ok(self.data.unwrap_or_default().list),
      RETCODE_AUTHKEY_INVALID | RETCODE_AUTHKEY_TIMEOUT => Err(Error::AuthInvalid {
        retcode: self.retcode,
        message: self.message,
      }),
      RETCODE_VISIT_TOO_FREQUENTLY => Err(Error::RateLimited),
      retcode => Err(Error::Api { retcode, message: self.message }),
    }
  }
}

impl GachaLogItem {
  pub fn wish_id(&self) -> Result<WishId> { Ok(self.id.parse()?) }

  /// Normalise into the format-agnostic candidate shape. Times are read in
  /// the server offset of `uid`.
  pub fn to_candidate(&self, uid: &Uid) -> Result<PullCandidate> {
    let rarity = self
      .rank_type
      .trim()
      .parse::<u8>()
      .map_err(|_| Error::Malformed(format!("rank_type {:?}", self.rank_type)))?;
    let item_type = self
      .item_type
      .trim()
      .parse::<ItemType>()
      .map_err(|_| Error::Malformed(format!("item_type {:?}", self.item_type)))?;

    Ok(PullCandidate {
      name:       self.name.clone(),
      item_type:  Some(item_type),
      rarity:     Some(rarity),
      gacha_type: self.gacha_type.parse()?,
      time:       uid.parse_server_time(&self.time)?,
      wish_id:    Some(self.wish_id()?),
    })
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the gacha-log endpoint.
///
/// One call fetches one page. Implementations map protocol failures onto
/// [`Error`] but never retry; retrying is the pipeline's job.
pub trait GachaLogApi: Send + Sync {
  fn fetch_page<'a>(
    &'a self,
    request: &'a PageRequest,
  ) -> impl Future<Output = Result<Vec<GachaLogItem>>> + Send + 'a;
}
