//! Core types and algorithms for wish-history reconciliation.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the fuzzy item-name index, the banner catalog, pity recomputation and the
//! merge of freshly observed pulls into stored history. Storage backends and
//! the fetch/job layers depend on it; it depends on nothing of theirs.

pub mod banner;
pub mod catalog;
pub mod error;
pub mod fuzzy;
pub mod ids;
pub mod item;
pub mod notify;
pub mod pity;
pub mod pull;
pub mod reconcile;
pub mod store;

pub use error::{Error, Result};
