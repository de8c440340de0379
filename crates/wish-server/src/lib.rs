//! Server wiring for the wish reconciliation service.
//!
//! Holds the deserialised [`ServerConfig`], the translation from it into the
//! option structs of the library crates, and the top-level [`router`].

pub mod error;

pub use error::Error;

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use wish_api::ApiState;
use wish_core::{
  ids::UserId,
  notify::{NotificationEvent, Notifier},
  store::WishStore,
};
use wish_hoyolab::{FetchOptions, client::DEFAULT_BASE_URL, retry::ExponentialBackoff};
use wish_jobs::{CatalogSource, RefreshOptions, SchedulerConfig, WorkerOptions};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `WISH_*` environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  /// Local catalog document. Takes precedence over `catalog_url`.
  pub catalog_path:         Option<PathBuf>,
  pub catalog_url:          Option<String>,
  pub catalog_refresh_secs: u64,
  pub workers:              usize,
  pub job_timeout_secs:     u64,
  /// Cool-down after a completed job.
  pub rate_limit_secs:      u64,
  pub sweep_interval_secs:  u64,
  pub gacha_api_url:        String,
  pub http_timeout_secs:    u64,
  pub page_delay_min_ms:    u64,
  pub page_delay_max_ms:    u64,
  pub fetch_max_attempts:   u32,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 "127.0.0.1".into(),
      port:                 8080,
      store_path:           PathBuf::from("~/.local/share/wish/wishes.db"),
      catalog_path:         None,
      catalog_url:          None,
      catalog_refresh_secs: 24 * 60 * 60,
      workers:              4,
      job_timeout_secs:     600,
      rate_limit_secs:      3600,
      sweep_interval_secs:  300,
      gacha_api_url:        DEFAULT_BASE_URL.into(),
      http_timeout_secs:    30,
      page_delay_min_ms:    100,
      page_delay_max_ms:    500,
      fetch_max_attempts:   5,
    }
  }
}

impl ServerConfig {
  pub fn catalog_source(&self) -> Result<CatalogSource, Error> {
    match (&self.catalog_path, &self.catalog_url) {
      (Some(path), _) => Ok(CatalogSource::File(expand_tilde(path))),
      (None, Some(url)) => Ok(CatalogSource::Url(url.clone())),
      (None, None) => Err(Error::MissingCatalogSource),
    }
  }

  pub fn fetch_options(&self) -> Result<FetchOptions, Error> {
    let (min, max) = (self.page_delay_min_ms, self.page_delay_max_ms);
    if min > max {
      return Err(Error::InvalidPageDelay { min, max });
    }
    Ok(FetchOptions {
      page_delay_min: Duration::from_millis(min),
      page_delay_max: Duration::from_millis(max),
      retry: ExponentialBackoff {
        max_attempts: self.fetch_max_attempts,
        ..ExponentialBackoff::default()
      },
      ..FetchOptions::default()
    })
  }

  pub fn scheduler_config(&self) -> SchedulerConfig {
    SchedulerConfig {
      rate_limit:     Duration::from_secs(self.rate_limit_secs),
      sweep_interval: Duration::from_secs(self.sweep_interval_secs),
    }
  }

  pub fn worker_options(&self) -> WorkerOptions {
    WorkerOptions {
      workers:     self.workers,
      job_timeout: Duration::from_secs(self.job_timeout_secs),
    }
  }

  pub fn refresh_options(&self) -> RefreshOptions {
    RefreshOptions {
      interval: Duration::from_secs(self.catalog_refresh_secs),
      ..RefreshOptions::default()
    }
  }

  pub fn http_timeout(&self) -> Duration { Duration::from_secs(self.http_timeout_secs) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Notifications ────────────────────────────────────────────────────────────

/// Delivers notifications to the log. Stands in for a push channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  async fn notify(&self, user: &UserId, event: NotificationEvent) {
    tracing::info!(
      %user,
      message_key = event.message_key(),
      severity = ?event.severity(),
      count = ?event.count(),
      "notify"
    );
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// The API under `/api`, traced.
pub fn router<S>(state: ApiState<S>) -> Router
where
  S: WishStore + 'static,
{
  Router::new()
    .nest("/api", wish_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}
