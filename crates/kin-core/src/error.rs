//! Error types for `kin-core`.

use thiserror::Error;

use crate::{
  geo::GeoKind,
  person::PersonId,
  user::UserId,
  validate::Violation,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(#[from] Violation),

  #[error("clan not found: {0:?}")]
  ClanNotFound(String),

  #[error("person not found: {0}")]
  PersonNotFound(PersonId),

  /// A relation field points at a person that does not exist or belongs to
  /// another owner.
  #[error("{field}: person {id} not found")]
  UnknownReference { field: &'static str, id: PersonId },

  #[error("{kind} not found: {id}")]
  GeoNotFound { kind: GeoKind, id: i64 },

  #[error("{kind} {name:?} already exists")]
  GeoNameTaken { kind: GeoKind, name: String },

  #[error("family tree not found: {0}")]
  FamilyTreeNotFound(i64),

  #[error("user not found: {0}")]
  UserNotFound(UserId),

  #[error("username {0:?} is already taken")]
  UsernameTaken(String),
}

impl Error {
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::ClanNotFound(_)
        | Self::PersonNotFound(_)
        | Self::UnknownReference { .. }
        | Self::GeoNotFound { .. }
        | Self::FamilyTreeNotFound(_)
        | Self::UserNotFound(_)
    )
  }
}

/// Implemented by backend error types so callers can separate domain failures
/// (bad input, missing rows) from storage faults.
pub trait DomainError {
  fn as_domain(&self) -> Option<&Error>;
}

impl DomainError for Error {
  fn as_domain(&self) -> Option<&Error> { Some(self) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
