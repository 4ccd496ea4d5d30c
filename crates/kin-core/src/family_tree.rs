//! User-curated groupings of people, independent of the derived ancestry tree.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  person::{Person, PersonId},
  user::UserId,
  validate::{Violation, ViolationKind},
};

pub type FamilyTreeId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyTree {
  pub id:          FamilyTreeId,
  pub owner:       UserId,
  pub name:        String,
  pub description: String,
  /// Ordered by person id.
  pub members:     Vec<Person>,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewFamilyTree {
  pub name:        String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub members:     Vec<PersonId>,
}

/// Partial update; `members` replaces the whole membership when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FamilyTreePatch {
  pub name:        Option<String>,
  pub description: Option<String>,
  pub members:     Option<Vec<PersonId>>,
}

/// A family tree name must contain something other than whitespace.
pub fn check_name(name: &str) -> Result<(), Violation> {
  if name.trim().is_empty() {
    return Err(Violation::new("name", ViolationKind::BlankName, "name must not be blank"));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn whitespace_name_is_blank() {
    let err = check_name(" \t ").unwrap_err();
    assert_eq!(err.field, "name");
    assert_eq!(err.kind, ViolationKind::BlankName);
    assert!(check_name("Moyo family").is_ok());
  }
}
