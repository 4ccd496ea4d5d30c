//! Geographic provenance: chiefdoms, villages and locations.
//!
//! All three are "geo-entities": looked up by name case-insensitively and
//! created on first use. The rules for turning free text into a lookup key
//! live here; the get-or-create itself belongs to the store.

use serde::{Deserialize, Serialize};

use crate::validate::{Violation, ViolationKind};

pub type ChiefdomId = i64;
pub type VillageId = i64;
pub type LocationId = i64;

/// The three kinds of geo-entity.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GeoKind {
  Chiefdom,
  Village,
  Location,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chiefdom {
  pub id:   ChiefdomId,
  pub name: String,
}

/// A village always belongs to exactly one chiefdom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Village {
  pub id:       VillageId,
  pub name:     String,
  pub chiefdom: Chiefdom,
}

/// A place of current residence; unrelated to chiefdoms and villages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
  pub id:   LocationId,
  pub name: String,
}

// ─── Names ───────────────────────────────────────────────────────────────────

/// A trimmed, non-empty geo-entity name plus its case-folded lookup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoName {
  display: String,
  key:     String,
}

impl GeoName {
  /// Trim `raw` and derive its key. Blank input is rejected on `field`.
  pub fn parse(field: &'static str, raw: &str) -> Result<Self, Violation> {
    let display = raw.trim();
    if display.is_empty() {
      return Err(Violation::new(
        field,
        ViolationKind::BlankName,
        "name must not be blank",
      ));
    }
    Ok(Self {
      display: display.to_owned(),
      key:     fold(display),
    })
  }

  /// The casing stored when this name creates a new entity.
  pub fn display(&self) -> &str { &self.display }

  /// The case-insensitive lookup key.
  pub fn key(&self) -> &str { &self.key }
}

/// Case-fold `s` for case-insensitive equality.
pub fn fold(s: &str) -> String { s.trim().to_lowercase() }

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NewGeoEntity {
  pub name: String,
}

/// A village given by name, optionally with the name of its chiefdom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VillageInput {
  pub name:     String,
  #[serde(default)]
  pub chiefdom: Option<String>,
}

/// Partial update for a village. A new chiefdom name is resolved-or-created.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VillagePatch {
  pub name:     Option<String>,
  pub chiefdom: Option<String>,
}

/// Outcome of a get-or-create: the entity and whether this call created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
  pub entity:  T,
  pub created: bool,
}

// ─── Village parent resolution ───────────────────────────────────────────────

/// Where a village's chiefdom comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChiefdomRef {
  /// A name still to be resolved-or-created.
  Named(GeoName),
  /// An already stored chiefdom.
  Existing(ChiefdomId),
}

/// Decide which chiefdom a village belongs to.
///
/// An inline chiefdom name wins; otherwise `fallback` (the record's own
/// chiefdom of origin) is used. With neither, the village cannot exist and a
/// `missing_chiefdom` violation is reported on `field`.
pub fn village_chiefdom(
  field: &'static str,
  inline: Option<&str>,
  fallback: Option<ChiefdomRef>,
) -> Result<ChiefdomRef, Violation> {
  if let Some(name) = inline {
    return GeoName::parse(field, name).map(ChiefdomRef::Named);
  }
  fallback.ok_or_else(|| {
    Violation::new(
      field,
      ViolationKind::MissingChiefdom,
      "a chiefdom is required to resolve a village",
    )
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_trims_and_folds() {
    let name = GeoName::parse("name", "  Chivero ").unwrap();
    assert_eq!(name.display(), "Chivero");
    assert_eq!(name.key(), "chivero");
  }

  #[test]
  fn parse_folds_non_ascii() {
    let a = GeoName::parse("name", "ÉPINAL").unwrap();
    let b = GeoName::parse("name", "épinal").unwrap();
    assert_eq!(a.key(), b.key());
    assert_ne!(a.display(), b.display());
  }

  #[test]
  fn blank_name_is_rejected_on_field() {
    let err = GeoName::parse("current_location", "   ").unwrap_err();
    assert_eq!(err.field, "current_location");
    assert_eq!(err.kind, ViolationKind::BlankName);
  }

  #[test]
  fn inline_chiefdom_wins_over_fallback() {
    let got = village_chiefdom(
      "chiefdom_of_origin",
      Some("Chivero"),
      Some(ChiefdomRef::Existing(7)),
    )
    .unwrap();
    assert!(matches!(got, ChiefdomRef::Named(n) if n.key() == "chivero"));
  }

  #[test]
  fn fallback_used_when_inline_missing() {
    let got =
      village_chiefdom("chiefdom_of_origin", None, Some(ChiefdomRef::Existing(7)))
        .unwrap();
    assert_eq!(got, ChiefdomRef::Existing(7));
  }

  #[test]
  fn no_chiefdom_is_a_violation() {
    let err = village_chiefdom("chiefdom_of_origin", None, None).unwrap_err();
    assert_eq!(err.field, "chiefdom_of_origin");
    assert_eq!(err.kind, ViolationKind::MissingChiefdom);
  }

  #[test]
  fn kind_displays_lowercase() {
    assert_eq!(GeoKind::Village.to_string(), "village");
    assert_eq!(GeoKind::Chiefdom.as_ref(), "chiefdom");
  }
}
