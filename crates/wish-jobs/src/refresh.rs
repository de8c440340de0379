//! Catalog loading and periodic refresh.
//!
//! The first load retries with jitter; until it succeeds the handle stays
//! empty and catalog-dependent work reports "not ready". Later refreshes are
//! single attempts: a failure keeps the previous snapshot in place.

use std::{fmt, path::PathBuf, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wish_core::catalog::{CatalogDocument, CatalogHandle, CatalogSnapshot};
use wish_hoyolab::retry::{self, JitteredDelay, sleep_or_cancel};

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
  File(PathBuf),
  Url(String),
}

impl CatalogSource {
  pub async fn load(&self, client: &reqwest::Client) -> Result<CatalogDocument> {
    match self {
      Self::File(path) => {
        let text = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&text)?)
      }
      Self::Url(url) => Ok(client.get(url).send().await?.error_for_status()?.json().await?),
    }
  }

  async fn snapshot(&self, client: &reqwest::Client) -> Result<CatalogSnapshot> {
    Ok(CatalogSnapshot::from_document(self.load(client).await?)?)
  }
}

impl fmt::Display for CatalogSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::File(path) => write!(f, "{}", path.display()),
      Self::Url(url) => f.write_str(url),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOptions {
  pub interval: Duration,
  /// Retry policy of the first load only.
  pub initial:  JitteredDelay,
}

impl Default for RefreshOptions {
  fn default() -> Self {
    Self {
      interval: Duration::from_secs(24 * 60 * 60),
      initial:  JitteredDelay {
        max_attempts: 5,
        min:          Duration::from_millis(800),
        max:          Duration::from_millis(1200),
      },
    }
  }
}

pub struct CatalogRefresher {
  source:  CatalogSource,
  client:  reqwest::Client,
  handle:  CatalogHandle,
  options: RefreshOptions,
}

impl CatalogRefresher {
  pub fn new(source: CatalogSource, handle: CatalogHandle, options: RefreshOptions) -> Result<Self> {
    let client = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { source, client, handle, options })
  }

  pub fn handle(&self) -> &CatalogHandle { &self.handle }

  /// Load the catalog, retrying per [`RefreshOptions::initial`].
  pub async fn load_initial(&self, cancel: &CancellationToken) -> Result<()> {
    let snapshot = retry::execute(&self.options.initial, cancel, |_| true, |attempt| {
      tracing::debug!(source = %self.source, attempt, "loading catalog");
      self.source.snapshot(&self.client)
    })
    .await?;
    self.install(snapshot);
    Ok(())
  }

  /// One load attempt. On failure the current snapshot stays.
  pub async fn refresh(&self) -> Result<()> {
    let snapshot = self.source.snapshot(&self.client).await?;
    self.install(snapshot);
    Ok(())
  }

  fn install(&self, snapshot: CatalogSnapshot) {
    tracing::info!(
      source = %self.source,
      items = snapshot.items.len(),
      "catalog loaded"
    );
    self.handle.replace(snapshot);
  }

  /// Refresh every `interval` until `cancel` fires.
  pub async fn run(self, cancel: CancellationToken) {
    while sleep_or_cancel(self.options.interval, &cancel).await {
      if let Err(e) = self.refresh().await {
        tracing::warn!(
          source = %self.source,
          error = %e,
          "catalog refresh failed; keeping previous snapshot"
        );
      }
    }
  }

  pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> { tokio::spawn(self.run(cancel)) }
}
