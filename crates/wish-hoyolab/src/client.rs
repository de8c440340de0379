//! [`HoyolabClient`], the HTTP implementation of [`GachaLogApi`].

use std::time::Duration;

use reqwest::Client;

use crate::{
  Error, Result,
  api::{GachaLogApi, GachaLogItem, GachaLogResponse, PAGE_SIZE, PageRequest},
};

pub const DEFAULT_BASE_URL: &str =
  "https://public-operation-hk4e-sg.hoyoverse.com/gacha_info/api/getGachaLog";

/// Async HTTP client for the gacha-log endpoint.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct HoyolabClient {
  client:   Client,
  base_url: String,
}

impl HoyolabClient {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, base_url: base_url.into() })
  }

  async fn get(&self, request: &PageRequest) -> Result<Vec<GachaLogItem>> {
    let resp = self
      .client
      .get(&self.base_url)
      .query(&[
        ("authkey", request.authkey.clone()),
        ("authkey_ver", "1".to_owned()),
        ("lang", "en-us".to_owned()),
        ("page", request.page.to_string()),
        ("size", PAGE_SIZE.to_string()),
        ("end_id", request.end_id.to_string()),
        ("gacha_type", request.gacha_type.to_string()),
      ])
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::Status(resp.status()));
    }
    resp.json::<GachaLogResponse>().await?.into_items()
  }
}

impl GachaLogApi for HoyolabClient {
  async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<GachaLogItem>> {
    tracing::debug!(
      gacha_type = %request.gacha_type,
      page = request.page,
      end_id = %request.end_id,
      "requesting gacha log page"
    );
    self.get(request).await
  }
}
