//! Field-level validation of relation changes.

use serde::Serialize;
use thiserror::Error;

use crate::person::PersonId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
  /// A person named as their own mother or father.
  SelfParent,
  /// A person listed among their own spouses.
  SelfSpouse,
  /// A village was requested with no chiefdom to place it under.
  MissingChiefdom,
  /// A geo-entity name that is empty after trimming.
  BlankName,
  /// A request body that is not valid JSON or does not fit the expected shape.
  Invalid,
}

/// A single rejected field, reported before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct Violation {
  pub field:   &'static str,
  #[serde(rename = "code")]
  pub kind:    ViolationKind,
  pub message: String,
}

impl Violation {
  pub fn new(
    field: &'static str,
    kind: ViolationKind,
    message: impl Into<String>,
  ) -> Self {
    Self { field, kind, message: message.into() }
  }
}

/// Proposed relation values for a person. `None` means "not being set" (or
/// being cleared), neither of which can be a self-reference.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationChanges<'a> {
  pub mother:  Option<PersonId>,
  pub father:  Option<PersonId>,
  pub spouses: Option<&'a [PersonId]>,
}

/// Reject direct self-references. Rules are checked in order and the first
/// failure is returned. Longer cycles (A's mother is B, B's mother is A) are
/// not detected here.
pub fn validate_relations(
  target: Option<PersonId>,
  changes: &RelationChanges<'_>,
) -> Result<(), Violation> {
  let Some(target) = target else { return Ok(()) };

  if changes.mother == Some(target) {
    return Err(Violation::new(
      "mother",
      ViolationKind::SelfParent,
      "a person cannot be their own mother",
    ));
  }
  if changes.father == Some(target) {
    return Err(Violation::new(
      "father",
      ViolationKind::SelfParent,
      "a person cannot be their own father",
    ));
  }
  if changes.spouses.is_some_and(|s| s.contains(&target)) {
    return Err(Violation::new(
      "spouses",
      ViolationKind::SelfSpouse,
      "a person cannot be their own spouse",
    ));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn self_mother_rejected() {
    let err = validate_relations(
      Some(4),
      &RelationChanges { mother: Some(4), ..Default::default() },
    )
    .unwrap_err();
    assert_eq!(err.field, "mother");
    assert_eq!(err.kind, ViolationKind::SelfParent);
  }

  #[test]
  fn self_father_rejected() {
    let err = validate_relations(
      Some(4),
      &RelationChanges { father: Some(4), ..Default::default() },
    )
    .unwrap_err();
    assert_eq!(err.field, "father");
    assert_eq!(err.kind, ViolationKind::SelfParent);
  }

  #[test]
  fn self_spouse_rejected() {
    let spouses = [2, 4, 9];
    let err = validate_relations(
      Some(4),
      &RelationChanges { spouses: Some(&spouses), ..Default::default() },
    )
    .unwrap_err();
    assert_eq!(err.field, "spouses");
    assert_eq!(err.kind, ViolationKind::SelfSpouse);
  }

  #[test]
  fn mother_reported_before_father_and_spouses() {
    let spouses = [4];
    let err = validate_relations(
      Some(4),
      &RelationChanges {
        mother:  Some(4),
        father:  Some(4),
        spouses: Some(&spouses),
      },
    )
    .unwrap_err();
    assert_eq!(err.field, "mother");
  }

  #[test]
  fn unrelated_ids_pass() {
    let spouses = [5, 6];
    validate_relations(
      Some(4),
      &RelationChanges {
        mother:  Some(1),
        father:  Some(2),
        spouses: Some(&spouses),
      },
    )
    .unwrap();
  }

  #[test]
  fn unknown_target_always_passes() {
    validate_relations(
      None,
      &RelationChanges { mother: Some(1), ..Default::default() },
    )
    .unwrap();
  }
}
