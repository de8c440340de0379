//! Parsers for user-supplied wish-history exports.
//!
//! Two formats are accepted, each modelled as a variant of [`ImportSource`]:
//!
//! - [`ImportFormat::Paimon`]: a Paimon.moe tracker backup. Item ids are
//!   clean snake_case identifiers, but the export cannot seed an empty history.
//! - [`ImportFormat::Regular`]: a flat list of rows transcribed from the
//!   official history page, often by hand or OCR.
//!
//! Both normalise to [`PullCandidate`]s, newest first, so nothing downstream
//! knows which format a pull came from. Pure synchronous; no HTTP or database
//! dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use wish_import::{ImportFormat, ImportSource};
//!
//! let uid = "800000000".parse().unwrap();
//! let json = r#"[{"name":"Noelle","gachaType":"200","time":"2023-01-01 12:00:00"}]"#;
//! let source = ImportSource::parse(ImportFormat::Regular, json).unwrap();
//! let candidates = source.candidates(&uid).unwrap();
//! println!("{} candidates", candidates.len());
//! ```

pub mod error;
mod paimon;
mod regular;

use serde::{Deserialize, Serialize};
use wish_core::{
  catalog::PullOrigin,
  ids::Uid,
  pull::{GachaType, PullCandidate},
};

pub use crate::{
  error::{Error, Result},
  paimon::{PaimonCounter, PaimonExport, PaimonPull},
  regular::RegularRow,
};

// ─── Public types ────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ImportFormat {
  Paimon,
  Regular,
}

/// A parsed export, still in its source shape.
#[derive(Debug, Clone)]
pub enum ImportSource {
  Paimon(PaimonExport),
  Regular(Vec<RegularRow>),
}

/// A gacha code as exports spell it: `301` or `"301"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCode {
  Number(u16),
  Text(String),
}

impl RawCode {
  pub fn gacha_type(&self) -> wish_core::Result<GachaType> {
    match self {
      Self::Number(code) => GachaType::from_code(*code)
        .ok_or_else(|| wish_core::Error::UnknownGachaType(code.to_string())),
      Self::Text(code) => code.parse(),
    }
  }
}

// ─── Public API ──────────────────────────────────────────────────────────────

impl ImportSource {
  /// Parse `input` as an export of the given format.
  pub fn parse(format: ImportFormat, input: &str) -> Result<Self> {
    Self::from_value(format, serde_json::from_str(input)?)
  }

  /// Parse an already-decoded JSON export. A JSON string is unwrapped first,
  /// so an export embedded as text in a request body is accepted too.
  pub fn from_value(format: ImportFormat, value: serde_json::Value) -> Result<Self> {
    let value = match value {
      serde_json::Value::String(text) => serde_json::from_str(&text)?,
      other => other,
    };
    Ok(match format {
      ImportFormat::Paimon => Self::Paimon(serde_json::from_value(value)?),
      ImportFormat::Regular => Self::Regular(serde_json::from_value(value)?),
    })
  }

  pub fn format(&self) -> ImportFormat {
    match self {
      Self::Paimon(_) => ImportFormat::Paimon,
      Self::Regular(_) => ImportFormat::Regular,
    }
  }

  /// How the catalog should treat the names this source produces.
  pub fn origin(&self) -> PullOrigin {
    match self {
      Self::Paimon(_) => PullOrigin::PaimonImport,
      Self::Regular(_) => PullOrigin::RegularImport,
    }
  }

  /// Whether the uid must already have stored history for this import to be
  /// accepted.
  pub fn requires_history(&self) -> bool { matches!(self, Self::Paimon(_)) }

  /// Normalise to format-agnostic candidates, newest first.
  pub fn candidates(&self, uid: &Uid) -> Result<Vec<PullCandidate>> {
    let candidates = match self {
      Self::Paimon(export) => paimon::candidates(export, uid)?,
      Self::Regular(rows) => regular::candidates(rows, uid)?,
    };
    if candidates.is_empty() {
      return Err(Error::NoPulls);
    }
    tracing::debug!(
      format = %self.format(),
      %uid,
      count = candidates.len(),
      "normalised import"
    );
    Ok(candidates)
  }
}

/// Wrap a per-row failure with the row's position in the export.
pub(crate) fn row_error(row: usize) -> impl FnOnce(wish_core::Error) -> Error {
  move |e| Error::InvalidRow { row, reason: e.to_string() }
}
