//! Paging through an account's gacha log.
//!
//! Pipeline, per banner code:
//!   page 1 (end_id 0)
//!     └─ fetch with retry         → raw items, newest first
//!          └─ drop known ids      → stop paging once anything known shows up
//!               └─ random delay   → next page (end_id = last item)
//!
//! Every collected item is then normalised and staged through the catalog
//! snapshot: name resolution, banner classification, featured flag.

use std::{collections::BTreeMap, time::Duration};

use tokio_util::sync::CancellationToken;
use wish_core::{
  catalog::{CatalogSnapshot, PullOrigin},
  ids::{Uid, WishId},
  pull::{GachaType, Pull},
};

use crate::{
  Error, Result,
  api::{GachaLogApi, GachaLogItem, PageRequest},
  retry::{self, ExponentialBackoff, jitter, sleep_or_cancel},
};

// ─── Options ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct FetchOptions {
  /// Banner codes queried, in order.
  pub gacha_types:    Vec<GachaType>,
  /// Courtesy delay between consecutive page requests.
  pub page_delay_min: Duration,
  pub page_delay_max: Duration,
  pub retry:          ExponentialBackoff,
}

impl Default for FetchOptions {
  fn default() -> Self {
    Self {
      gacha_types:    GachaType::FETCHED.to_vec(),
      page_delay_min: Duration::from_millis(100),
      page_delay_max: Duration::from_millis(500),
      retry:          ExponentialBackoff::default(),
    }
  }
}

/// One account's fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
  pub uid:     Uid,
  pub authkey: String,
  /// Greatest persisted external id per queried code. Paging for a code stops
  /// at the first page reaching this id.
  pub known:   BTreeMap<GachaType, WishId>,
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

pub struct FetchPipeline<A> {
  api:     A,
  options: FetchOptions,
}

impl<A: GachaLogApi> FetchPipeline<A> {
  pub fn new(api: A, options: FetchOptions) -> Self { Self { api, options } }

  pub fn api(&self) -> &A { &self.api }

  /// Fetch every configured banner code and stage the new pulls, newest
  /// first within each code.
  ///
  /// Nothing is persisted here; a cancelled or failed fetch leaves no trace.
  pub async fn fetch(
    &self,
    request: &FetchRequest,
    catalog: &CatalogSnapshot,
    cancel: &CancellationToken,
  ) -> Result<Vec<Pull>> {
    let mut staged = Vec::new();
    let mut first_request = true;

    for &gacha_type in &self.options.gacha_types {
      let known = request.known.get(&gacha_type).copied();
      let items = self
        .fetch_gacha_type(request, gacha_type, known, &mut first_request, cancel)
        .await?;

      for item in items {
        let candidate = item.to_candidate(&request.uid)?;
        staged.push(catalog.stage(&request.uid, candidate, PullOrigin::Api)?);
      }
    }

    tracing::info!(uid = %request.uid, count = staged.len(), "fetched new pulls");
    Ok(staged)
  }

  /// Raw items of one banner code newer than `known`, newest first.
  async fn fetch_gacha_type(
    &self,
    request: &FetchRequest,
    gacha_type: GachaType,
    known: Option<WishId>,
    first_request: &mut bool,
    cancel: &CancellationToken,
  ) -> Result<Vec<GachaLogItem>> {
    let mut out = Vec::new();
    let mut page = PageRequest::first(request.authkey.clone(), gacha_type);

    loop {
      if !std::mem::take(first_request) {
        let delay = jitter(self.options.page_delay_min, self.options.page_delay_max);
        if !sleep_or_cancel(delay, cancel).await {
          return Err(Error::Cancelled);
        }
      }
      if cancel.is_cancelled() {
        return Err(Error::Cancelled);
      }

      let items = self.fetch_page(&page, cancel).await?;
      tracing::debug!(
        uid = %request.uid,
        %gacha_type,
        page = page.page,
        items = items.len(),
        "fetched page"
      );
      let Some(last) = items.last() else { break };
      let last = last.wish_id()?;

      // Ids descend within a page, so everything after a known id is known.
      let mut reached_known = false;
      for item in items {
        let id = item.wish_id()?;
        if known.is_some_and(|known| id <= known) {
          reached_known = true;
          break;
        }
        out.push(item);
      }
      if reached_known {
        break;
      }
      page = page.next(last);
    }

    Ok(out)
  }

  async fn fetch_page(
    &self,
    page: &PageRequest,
    cancel: &CancellationToken,
  ) -> Result<Vec<GachaLogItem>> {
    let result = retry::execute(&self.options.retry, cancel, Error::is_transient, |_| {
      self.api.fetch_page(page)
    })
    .await;

    match result {
      Err(e) if cancel.is_cancelled() => {
        tracing::debug!(error = %e, "fetch cancelled during backoff");
        Err(Error::Cancelled)
      }
      other => other,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::VecDeque, sync::Mutex};

  use wish_core::{
    banner::{Banner, BannerKeyType},
    catalog::CatalogDocument,
    item::Item,
    pull::ItemType,
  };

  use super::*;

  /// Replays scripted page results and records every request.
  #[derive(Default)]
  struct ScriptedApi {
    pages: Mutex<VecDeque<Result<Vec<GachaLogItem>>>>,
    calls: Mutex<Vec<PageRequest>>,
  }

  impl ScriptedApi {
    fn new(pages: Vec<Result<Vec<GachaLogItem>>>) -> Self {
      Self { pages: Mutex::new(pages.into()), calls: Mutex::default() }
    }

    fn calls(&self) -> Vec<PageRequest> { self.calls.lock().unwrap().clone() }
  }

  impl GachaLogApi for ScriptedApi {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<GachaLogItem>> {
      self.calls.lock().unwrap().push(request.clone());
      self.pages.lock().unwrap().pop_front().unwrap_or(Ok(Vec::new()))
    }
  }

  fn item(id: u64, name: &str, minute: u32) -> GachaLogItem {
    let (item_type, rank_type) = match name {
      "Amber" => ("Character", "4"),
      _ => ("Weapon", "3"),
    };
    GachaLogItem {
      uid:        "800000000".into(),
      gacha_type: "200".into(),
      item_id:    String::new(),
      count:      "1".into(),
      time:       format!("2023-01-01 12:{minute:02}:00"),
      name:       name.into(),
      lang:       "en-us".into(),
      item_type:  item_type.into(),
      rank_type:  rank_type.into(),
      id:         id.to_string(),
    }
  }

  fn catalog() -> CatalogSnapshot {
    CatalogSnapshot::from_document(CatalogDocument {
      banners: vec![Banner {
        id:             "permanent".into(),
        key_type:       BannerKeyType::Permanent,
        start_duration: None,
        duration:       None,
        featured:       Default::default(),
        version:        "1.0".into(),
      }],
      items:   vec![
        Item { name: "Cool Steel".into(), item_type: ItemType::Weapon, rarity: 3 },
        Item { name: "Amber".into(), item_type: ItemType::Character, rarity: 4 },
      ],
    })
    .unwrap()
  }

  fn options() -> FetchOptions {
    FetchOptions {
      gacha_types:    vec![GachaType::Permanent],
      page_delay_min: Duration::ZERO,
      page_delay_max: Duration::ZERO,
      retry:          ExponentialBackoff { max_attempts: 3, initial: Duration::from_millis(1) },
    }
  }

  fn request(known: Option<u64>) -> FetchRequest {
    FetchRequest {
      uid:     "800000000".parse().unwrap(),
      authkey: "secret".into(),
      known:   known
        .map(|id| BTreeMap::from([(GachaType::Permanent, WishId(id))]))
        .unwrap_or_default(),
    }
  }

  #[tokio::test]
  async fn two_pages_then_empty_page_take_three_calls() {
    let api = ScriptedApi::new(vec![
      Ok(vec![item(10, "Cool Steel", 4), item(9, "Amber", 3)]),
      Ok(vec![item(8, "Cool Steel", 2), item(7, "Cool Steel", 1)]),
      Ok(vec![]),
    ]);
    let pipeline = FetchPipeline::new(api, options());

    let staged = pipeline
      .fetch(&request(None), &catalog(), &CancellationToken::new())
      .await
      .unwrap();

    let calls = pipeline.api().calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].end_id, WishId(0));
    assert_eq!(calls[1].end_id, WishId(9));
    assert_eq!(calls[2].page, 3);

    let ids: Vec<u64> = staged.iter().filter_map(|p| p.genshin_wish_id).map(|id| id.0).collect();
    assert_eq!(ids, vec![10, 9, 8, 7]);
    assert_eq!(staged[1].name, "Amber");
    assert_eq!(staged[1].rarity, 4);
    assert_eq!(staged[1].banner_id, "permanent");
    assert!(staged.iter().all(|p| !p.was_imported));
  }

  #[tokio::test]
  async fn paging_stops_at_persisted_history() {
    let api = ScriptedApi::new(vec![
      Ok(vec![item(10, "Cool Steel", 4), item(9, "Cool Steel", 3)]),
      Ok(vec![item(8, "Cool Steel", 2), item(7, "Cool Steel", 1)]),
    ]);
    let pipeline = FetchPipeline::new(api, options());

    let staged = pipeline
      .fetch(&request(Some(9)), &catalog(), &CancellationToken::new())
      .await
      .unwrap();

    assert_eq!(pipeline.api().calls().len(), 1);
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].genshin_wish_id, Some(WishId(10)));
  }

  #[tokio::test]
  async fn rejected_authkey_is_not_retried() {
    let api = ScriptedApi::new(vec![Err(Error::AuthInvalid {
      retcode: -100,
      message: "authkey error".into(),
    })]);
    let pipeline = FetchPipeline::new(api, options());

    let err = pipeline
      .fetch(&request(None), &catalog(), &CancellationToken::new())
      .await
      .unwrap_err();

    assert!(matches!(err, Error::AuthInvalid { .. }));
    assert_eq!(pipeline.api().calls().len(), 1);
  }

  #[tokio::test]
  async fn rate_limit_is_retried() {
    let api = ScriptedApi::new(vec![
      Err(Error::RateLimited),
      Ok(vec![item(10, "Cool Steel", 4)]),
      Ok(vec![]),
    ]);
    let pipeline = FetchPipeline::new(api, options());

    let staged = pipeline
      .fetch(&request(None), &catalog(), &CancellationToken::new())
      .await
      .unwrap();

    assert_eq!(staged.len(), 1);
    assert_eq!(pipeline.api().calls().len(), 3);
  }

  #[tokio::test]
  async fn cancelled_fetch_makes_no_calls() {
    let pipeline = FetchPipeline::new(ScriptedApi::default(), options());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = pipeline.fetch(&request(None), &catalog(), &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(pipeline.api().calls().is_empty());
  }

  #[tokio::test]
  async fn unknown_api_names_are_kept_verbatim() {
    let api = ScriptedApi::new(vec![Ok(vec![item(10, "Brand New Greatsword", 4)]), Ok(vec![])]);
    let pipeline = FetchPipeline::new(api, options());

    let staged = pipeline
      .fetch(&request(None), &catalog(), &CancellationToken::new())
      .await
      .unwrap();
    assert_eq!(staged[0].name, "Brand New Greatsword");
    assert_eq!(staged[0].rarity, 3);
  }
}
