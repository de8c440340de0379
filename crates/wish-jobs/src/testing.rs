//! Doubles shared by the service and worker tests.

use std::{
  collections::{BTreeSet, HashMap, VecDeque},
  sync::Mutex,
  time::Duration,
};

use chrono::{TimeZone, Utc};
use tokio::sync::mpsc;
use wish_core::{
  banner::{Banner, BannerKeyType},
  catalog::{CatalogDocument, CatalogHandle, CatalogSnapshot},
  ids::{Uid, UserId, WishId},
  item::Item,
  notify::{NotificationEvent, Notifier},
  pull::{GachaType, ItemType, Pull},
  store::{Account, WishStore},
};
use wish_hoyolab::{
  FetchOptions, FetchPipeline, GachaLogApi, GachaLogItem, PageRequest, retry::ExponentialBackoff,
};
use wish_store_sqlite::SqliteStore;

use crate::service::WishService;

pub(crate) fn uid() -> Uid { "800000000".parse().unwrap() }

pub(crate) fn alice() -> UserId { UserId::new("alice") }

pub(crate) fn document() -> CatalogDocument {
  let item = |name: &str, item_type, rarity| Item { name: name.into(), item_type, rarity };
  CatalogDocument {
    banners: vec![
      Banner {
        id:             "venti-1".into(),
        key_type:       BannerKeyType::CharacterEvent,
        start_duration: Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
        duration:       Some(Utc.with_ymd_and_hms(2023, 1, 31, 0, 0, 0).unwrap()),
        featured:       BTreeSet::from(["Venti".to_owned(), "Noelle".to_owned()]),
        version:        "3.4".into(),
      },
      Banner {
        id:             "permanent".into(),
        key_type:       BannerKeyType::Permanent,
        start_duration: None,
        duration:       None,
        featured:       BTreeSet::new(),
        version:        "1.0".into(),
      },
    ],
    items:   vec![
      item("Noelle", ItemType::Character, 4),
      item("Cool Steel", ItemType::Weapon, 3),
      item("Amber", ItemType::Character, 4),
      item("Venti", ItemType::Character, 5),
      item("Diluc", ItemType::Character, 5),
    ],
  }
}

pub(crate) fn catalog() -> CatalogHandle {
  CatalogHandle::with_snapshot(CatalogSnapshot::from_document(document()).unwrap())
}

/// A raw API item. Ids double as the minute of the pull, so higher ids are
/// newer.
pub(crate) fn log_item(gacha_type: GachaType, id: u64, name: &str) -> GachaLogItem {
  let (item_type, rank) = match name {
    "Venti" | "Diluc" => ("Character", "5"),
    "Amber" | "Noelle" => ("Character", "4"),
    _ => ("Weapon", "3"),
  };
  GachaLogItem {
    uid:        uid().to_string(),
    gacha_type: gacha_type.to_string(),
    item_id:    String::new(),
    count:      "1".into(),
    time:       format!("2023-01-10 12:{:02}:00", id % 60),
    name:       name.into(),
    lang:       "en-us".into(),
    item_type:  item_type.into(),
    rank_type:  rank.into(),
    id:         id.to_string(),
  }
}

// ─── API ─────────────────────────────────────────────────────────────────────

/// Serves one scripted page per request and banner code, then empty pages.
#[derive(Default)]
pub(crate) struct ScriptedApi {
  pages: Mutex<HashMap<GachaType, VecDeque<wish_hoyolab::Result<Vec<GachaLogItem>>>>>,
  calls: Mutex<Vec<PageRequest>>,
  hang:  bool,
}

impl ScriptedApi {
  /// An API whose requests never complete.
  pub(crate) fn hanging() -> Self { Self { hang: true, ..Self::default() } }

  pub(crate) fn page(self, gacha_type: GachaType, items: Vec<GachaLogItem>) -> Self {
    self.push(gacha_type, items);
    self
  }

  pub(crate) fn fail(self, gacha_type: GachaType, error: wish_hoyolab::Error) -> Self {
    self.pages.lock().unwrap().entry(gacha_type).or_default().push_back(Err(error));
    self
  }

  pub(crate) fn push(&self, gacha_type: GachaType, items: Vec<GachaLogItem>) {
    self.pages.lock().unwrap().entry(gacha_type).or_default().push_back(Ok(items));
  }

  pub(crate) fn calls(&self) -> Vec<PageRequest> { self.calls.lock().unwrap().clone() }
}

impl GachaLogApi for ScriptedApi {
  async fn fetch_page(&self, request: &PageRequest) -> wish_hoyolab::Result<Vec<GachaLogItem>> {
    self.calls.lock().unwrap().push(request.clone());
    if self.hang {
      std::future::pending::<()>().await;
    }
    let next = self
      .pages
      .lock()
      .unwrap()
      .get_mut(&request.gacha_type)
      .and_then(VecDeque::pop_front);
    next.unwrap_or(Ok(Vec::new()))
  }
}

pub(crate) fn fetch_options() -> FetchOptions {
  FetchOptions {
    page_delay_min: Duration::ZERO,
    page_delay_max: Duration::ZERO,
    retry: ExponentialBackoff { max_attempts: 2, initial: Duration::from_millis(1) },
    ..FetchOptions::default()
  }
}

pub(crate) async fn service(api: ScriptedApi) -> WishService<SqliteStore, ScriptedApi> {
  service_with_catalog(api, catalog()).await
}

pub(crate) async fn service_with_catalog(
  api: ScriptedApi,
  catalog: CatalogHandle,
) -> WishService<SqliteStore, ScriptedApi> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  WishService::new(store, FetchPipeline::new(api, fetch_options()), catalog)
}

// ─── Notifier ────────────────────────────────────────────────────────────────

pub(crate) struct RecordingNotifier(mpsc::UnboundedSender<(UserId, NotificationEvent)>);

impl RecordingNotifier {
  pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<(UserId, NotificationEvent)>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self(tx), rx)
  }
}

impl Notifier for RecordingNotifier {
  async fn notify(&self, user: &UserId, event: NotificationEvent) {
    let _ = self.0.send((user.clone(), event));
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// [`SqliteStore`] whose pool replacements take `delay` each.
pub(crate) struct SlowStore {
  inner: SqliteStore,
  delay: Duration,
}

impl SlowStore {
  pub(crate) async fn new(delay: Duration) -> Self {
    Self { inner: SqliteStore::open_in_memory().await.unwrap(), delay }
  }
}

impl WishStore for SlowStore {
  type Error = wish_store_sqlite::Error;

  async fn add_account(&self, uid: Uid, user_id: UserId) -> Result<Account, Self::Error> {
    self.inner.add_account(uid, user_id).await
  }

  async fn get_account(&self, uid: &Uid) -> Result<Option<Account>, Self::Error> {
    self.inner.get_account(uid).await
  }

  async fn get_pulls(
    &self,
    uid: &Uid,
    gacha_type: Option<GachaType>,
  ) -> Result<Vec<Pull>, Self::Error> {
    self.inner.get_pulls(uid, gacha_type).await
  }

  async fn latest_wish_id(
    &self,
    uid: &Uid,
    gacha_type: GachaType,
  ) -> Result<Option<WishId>, Self::Error> {
    self.inner.latest_wish_id(uid, gacha_type).await
  }

  async fn replace_pulls(
    &self,
    uid: &Uid,
    pool: GachaType,
    pulls: Vec<Pull>,
  ) -> Result<(), Self::Error> {
    tokio::time::sleep(self.delay).await;
    self.inner.replace_pulls(uid, pool, pulls).await
  }
}
