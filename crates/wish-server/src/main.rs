//! wish-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) layered under
//! `WISH_*` environment variables, opens the SQLite store, starts the catalog
//! refresher, the job workers and the sweeper, and serves the JSON API until
//! Ctrl-C.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use wish_api::ApiState;
use wish_core::catalog::CatalogHandle;
use wish_hoyolab::{FetchPipeline, HoyolabClient};
use wish_jobs::{CatalogRefresher, JobScheduler, WishService, spawn_workers};
use wish_server::{ServerConfig, TracingNotifier, expand_tilde};
use wish_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Wish history reconciliation server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("WISH"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  // Open SQLite store.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let shutdown = CancellationToken::new();

  // Catalog: first load in the background, so `/health` reports 503 until it
  // lands, then refresh on the interval.
  let catalog = CatalogHandle::new();
  let refresher = CatalogRefresher::new(
    server_cfg.catalog_source()?,
    catalog.clone(),
    server_cfg.refresh_options(),
  )
  .context("failed to build catalog client")?;
  let catalog_task = tokio::spawn({
    let shutdown = shutdown.clone();
    async move {
      if let Err(e) = refresher.load_initial(&shutdown).await {
        tracing::error!(error = %e, "initial catalog load failed; serving as not ready");
      }
      refresher.run(shutdown).await;
    }
  });

  // Jobs.
  let api = HoyolabClient::new(server_cfg.gacha_api_url.clone(), server_cfg.http_timeout())
    .context("failed to build gacha-log client")?;
  let pipeline = FetchPipeline::new(api, server_cfg.fetch_options()?);
  let service = Arc::new(WishService::new(store.clone(), pipeline, catalog.clone()));
  let (scheduler, queue) = JobScheduler::new(server_cfg.scheduler_config());
  let mut tasks = spawn_workers(
    queue,
    scheduler.clone(),
    service,
    Arc::new(TracingNotifier),
    server_cfg.worker_options(),
    shutdown.clone(),
  );
  tasks.push(scheduler.spawn_sweeper(shutdown.clone()));
  tasks.push(catalog_task);

  // Build application state.
  let state = ApiState { store: Arc::new(store), scheduler, catalog };

  let app = wish_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown({
      let shutdown = shutdown.clone();
      async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
          tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
        tracing::info!("shutting down");
        shutdown.cancel();
      }
    })
    .await
    .context("server error")?;

  shutdown.cancel();
  for task in tasks {
    if let Err(e) = task.await {
      tracing::warn!(error = %e, "background task panicked");
    }
  }

  Ok(())
}
