//! Error type for `kin-store-sqlite`.

use kin_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Invalid input or a missing row; safe to show to the caller.
  #[error(transparent)]
  Domain(#[from] kin_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown gender in storage: {0:?}")]
  UnknownGender(String),
}

impl DomainError for Error {
  fn as_domain(&self) -> Option<&kin_core::Error> {
    match self {
      Error::Domain(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure inside a closure running on the database thread.
///
/// Domain failures abort the surrounding transaction just like SQL errors but
/// travel back to the caller intact.
#[derive(Debug)]
pub(crate) enum TxError {
  Sql(rusqlite::Error),
  Domain(kin_core::Error),
  Decode(Error),
}

impl From<rusqlite::Error> for TxError {
  fn from(e: rusqlite::Error) -> Self { TxError::Sql(e) }
}

impl From<kin_core::Error> for TxError {
  fn from(e: kin_core::Error) -> Self { TxError::Domain(e) }
}

impl From<kin_core::validate::Violation> for TxError {
  fn from(v: kin_core::validate::Violation) -> Self {
    TxError::Domain(kin_core::Error::Validation(v))
  }
}

impl From<Error> for TxError {
  fn from(e: Error) -> Self {
    match e {
      Error::Domain(d) => TxError::Domain(d),
      Error::Sqlite(s) => TxError::Sql(s),
      other => TxError::Decode(other),
    }
  }
}

impl From<TxError> for Error {
  fn from(e: TxError) -> Self {
    match e {
      TxError::Sql(e) => Error::Sqlite(e),
      TxError::Domain(e) => Error::Domain(e),
      TxError::Decode(e) => e,
    }
  }
}
