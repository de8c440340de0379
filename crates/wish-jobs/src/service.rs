//! [`WishService`]: one fetch or import, end to end.
//!
//! ```text
//! fetch:  latest ids ─▶ FetchPipeline ─┐
//!                                      ├─▶ reconcile per pool ─▶ replace changed pools
//! import: ImportSource ─▶ stage ───────┘
//! ```
//!
//! Each operation runs in two phases. Staging ([`WishService::fetch_pulls`],
//! [`WishService::import_pulls`]) writes no pulls, so a failed or cancelled
//! stage leaves stored history untouched. [`WishService::persist`] then
//! replaces pools one at a time: each pool is atomic, but a failure between
//! two pools leaves the earlier ones committed.

use std::collections::{BTreeMap, BTreeSet};

use tokio_util::sync::CancellationToken;
use wish_core::{
  catalog::CatalogHandle,
  ids::{Uid, UserId},
  pull::{GachaType, Pull},
  reconcile::reconcile,
  store::WishStore,
};
use wish_hoyolab::{FetchPipeline, FetchRequest, GachaLogApi};
use wish_import::ImportSource;

use crate::{Error, Result};

pub struct WishService<S, A> {
  store:    S,
  pipeline: FetchPipeline<A>,
  catalog:  CatalogHandle,
}

impl<S: WishStore, A: GachaLogApi> WishService<S, A> {
  pub fn new(store: S, pipeline: FetchPipeline<A>, catalog: CatalogHandle) -> Self {
    Self { store, pipeline, catalog }
  }

  pub fn store(&self) -> &S { &self.store }

  pub fn catalog(&self) -> &CatalogHandle { &self.catalog }

  /// Fetch everything newer than stored history and merge it in. Returns the
  /// number of pulls appended.
  pub async fn fetch(
    &self,
    user: &UserId,
    uid: &Uid,
    authkey: &str,
    cancel: &CancellationToken,
  ) -> Result<usize> {
    let pulls = self.fetch_pulls(user, uid, authkey, cancel).await?;
    self.persist(uid, pulls).await
  }

  /// Merge a user-supplied export. Returns the number of pulls appended.
  pub async fn import(&self, user: &UserId, uid: &Uid, source: &ImportSource) -> Result<usize> {
    let pulls = self.import_pulls(user, uid, source).await?;
    self.persist(uid, pulls).await
  }

  /// Link the account and stage every pull newer than stored history.
  pub async fn fetch_pulls(
    &self,
    user: &UserId,
    uid: &Uid,
    authkey: &str,
    cancel: &CancellationToken,
  ) -> Result<Vec<Pull>> {
    let catalog = self.catalog.snapshot()?;
    self.store.add_account(uid.clone(), user.clone()).await.map_err(Error::store)?;

    let mut known = BTreeMap::new();
    for gacha_type in GachaType::FETCHED {
      if let Some(id) = self.store.latest_wish_id(uid, gacha_type).await.map_err(Error::store)? {
        known.insert(gacha_type, id);
      }
    }

    let request = FetchRequest { uid: uid.clone(), authkey: authkey.to_owned(), known };
    Ok(self.pipeline.fetch(&request, &catalog, cancel).await?)
  }

  /// Stage every row of an export, then link the account.
  ///
  /// A Paimon export cannot seed an empty history and is rejected with
  /// [`wish_core::Error::ColdImport`] before anything is linked or written.
  pub async fn import_pulls(
    &self,
    user: &UserId,
    uid: &Uid,
    source: &ImportSource,
  ) -> Result<Vec<Pull>> {
    let catalog = self.catalog.snapshot()?;

    if source.requires_history()
      && self.store.get_pulls(uid, None).await.map_err(Error::store)?.is_empty()
    {
      return Err(wish_core::Error::ColdImport(uid.clone()).into());
    }

    let origin = source.origin();
    let pulls = source
      .candidates(uid)?
      .into_iter()
      .enumerate()
      .map(|(i, candidate)| {
        catalog
          .stage(uid, candidate, origin)
          .map_err(|e| wish_import::Error::InvalidRow { row: i + 1, reason: e.to_string() })
      })
      .collect::<Result<Vec<_>, _>>()?;

    self.store.add_account(uid.clone(), user.clone()).await.map_err(Error::store)?;
    Ok(pulls)
  }

  /// Reconcile `pulls` (newest first) against stored history and replace
  /// every pool that gained pulls. Returns the number of pulls appended.
  pub async fn persist(&self, uid: &Uid, pulls: Vec<Pull>) -> Result<usize> {
    let pools: BTreeSet<GachaType> = pulls.iter().map(|p| p.gacha_type.pool()).collect();

    let mut current = BTreeMap::new();
    for pool in pools {
      let stored = self.store.get_pulls(uid, Some(pool)).await.map_err(Error::store)?;
      current.insert(pool, stored);
    }

    let mut appended = 0;
    for (pool, merge) in reconcile(pulls, current) {
      if merge.is_unchanged() {
        continue;
      }
      tracing::info!(
        %uid,
        gacha_type = %pool,
        appended = merge.appended,
        total = merge.pulls.len(),
        "merged pulls"
      );
      appended += merge.appended;
      self
        .store
        .replace_pulls(uid, pool, merge.pulls)
        .await
        .map_err(Error::store)?;
    }

    Ok(appended)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use wish_core::{catalog::CatalogHandle, ids::WishId};
  use wish_import::ImportFormat;

  use super::*;
  use crate::{
    error::FailureKind,
    testing::{ScriptedApi, alice, log_item, service, service_with_catalog, uid},
  };

  fn regular(rows: serde_json::Value) -> ImportSource {
    ImportSource::from_value(ImportFormat::Regular, rows).unwrap()
  }

  fn paimon(pulls: serde_json::Value) -> ImportSource {
    ImportSource::from_value(
      ImportFormat::Paimon,
      json!({ "wish-counter-standard": { "pulls": pulls } }),
    )
    .unwrap()
  }

  #[tokio::test]
  async fn fetch_into_empty_history() {
    let api = ScriptedApi::default()
      .page(GachaType::Permanent, vec![
        log_item(GachaType::Permanent, 3, "Amber"),
        log_item(GachaType::Permanent, 2, "Cool Steel"),
      ])
      .page(GachaType::CharacterEvent, vec![log_item(GachaType::CharacterEvent, 5, "Venti")]);
    let svc = service(api).await;
    let cancel = CancellationToken::new();

    assert_eq!(svc.fetch(&alice(), &uid(), "key", &cancel).await.unwrap(), 3);

    let standard = svc.store().get_pulls(&uid(), Some(GachaType::Permanent)).await.unwrap();
    assert_eq!(standard.len(), 2);
    assert_eq!(standard[0].name, "Amber");
    assert_eq!(standard[0].order, 2);
    assert_eq!(standard[0].pity, 2);

    let event = svc.store().get_pulls(&uid(), Some(GachaType::CharacterEvent)).await.unwrap();
    assert_eq!(event[0].name, "Venti");
    assert!(event[0].is_featured);
    assert!(event[0].won_fifty_fifty);
    assert_eq!(event[0].banner_id, "venti-1");

    let account = svc.store().get_account(&uid()).await.unwrap().unwrap();
    assert_eq!(account.user_id, alice());
  }

  #[tokio::test]
  async fn refetch_appends_only_unseen_pulls() {
    let first = ScriptedApi::default().page(GachaType::Permanent, vec![
      log_item(GachaType::Permanent, 3, "Amber"),
      log_item(GachaType::Permanent, 2, "Cool Steel"),
    ]);
    let svc = service(first).await;
    let cancel = CancellationToken::new();
    svc.fetch(&alice(), &uid(), "key", &cancel).await.unwrap();

    svc.pipeline.api().push(GachaType::Permanent, vec![
      log_item(GachaType::Permanent, 6, "Noelle"),
      log_item(GachaType::Permanent, 3, "Amber"),
    ]);
    assert_eq!(svc.fetch(&alice(), &uid(), "key", &cancel).await.unwrap(), 1);

    let standard = svc.store().get_pulls(&uid(), Some(GachaType::Permanent)).await.unwrap();
    assert_eq!(standard.len(), 3);
    assert_eq!(standard[0].genshin_wish_id, Some(WishId(6)));
    assert_eq!(standard[0].order, 3);
  }

  #[tokio::test]
  async fn regular_import_may_start_cold() {
    let svc = service(ScriptedApi::default()).await;
    let source = regular(json!([
      { "name": "N0e11e", "gachaType": 200, "time": "2023-01-02 12:00:00" },
      { "name": "cool steel", "gachaType": "200", "time": "2023-01-02 11:00:00" }
    ]));

    assert_eq!(svc.import(&alice(), &uid(), &source).await.unwrap(), 2);

    let stored = svc.store().get_pulls(&uid(), None).await.unwrap();
    assert_eq!(stored[0].name, "Noelle");
    assert_eq!(stored[1].name, "Cool Steel");
    assert!(stored.iter().all(|p| p.was_imported));
  }

  #[tokio::test]
  async fn paimon_import_needs_stored_history() {
    let svc = service(ScriptedApi::default()).await;
    let source = paimon(json!([
      { "type": "character", "id": "amber", "time": "2023-01-03 12:00:00" }
    ]));

    let err = svc.import(&alice(), &uid(), &source).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::ReconciliationInvariantViolation);
    assert!(svc.store().get_account(&uid()).await.unwrap().is_none());

    svc
      .import(&alice(), &uid(), &regular(json!([
        { "name": "Noelle", "gachaType": 200, "time": "2023-01-02 12:00:00" }
      ])))
      .await
      .unwrap();
    assert_eq!(svc.import(&alice(), &uid(), &source).await.unwrap(), 1);
    assert_eq!(svc.store().get_pulls(&uid(), None).await.unwrap()[0].name, "Amber");
  }

  #[tokio::test]
  async fn unresolvable_import_name_fails_without_writing() {
    let svc = service(ScriptedApi::default()).await;
    let source = regular(json!([
      { "name": "Qwertyuiopasdfghjkl", "gachaType": 200, "time": "2023-01-02 12:00:00" }
    ]));

    let err = svc.import(&alice(), &uid(), &source).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::InvalidImport);
    assert!(svc.store().get_pulls(&uid(), None).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn nothing_runs_before_the_catalog_loads() {
    let svc = service_with_catalog(ScriptedApi::default(), CatalogHandle::new()).await;
    let err = svc
      .fetch(&alice(), &uid(), "key", &CancellationToken::new())
      .await
      .unwrap_err();
    assert_eq!(err.kind(), FailureKind::CatalogUnavailable);
    assert!(svc.pipeline.api().calls().is_empty());
  }
}
