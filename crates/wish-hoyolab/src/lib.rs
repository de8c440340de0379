//! Client side of the external gacha-log API.
//!
//! [`GachaLogApi`] is the seam: [`HoyolabClient`] implements it over HTTP and
//! tests substitute an in-memory double. [`FetchPipeline`] pages through every
//! banner of an account, stops at already-persisted history and stages each
//! item through the current catalog snapshot.

pub mod api;
pub mod client;
pub mod error;
pub mod pipeline;
pub mod retry;

pub use api::{GachaLogApi, GachaLogItem, PageRequest};
pub use client::HoyolabClient;
pub use error::{Error, Result};
pub use pipeline::{FetchOptions, FetchPipeline, FetchRequest};
