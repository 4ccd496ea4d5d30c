//! Get-or-create for geo-entities.
//!
//! One code path serves chiefdoms, villages and locations. A [`GeoTarget`]
//! names the table and the uniqueness scope: chiefdoms and locations are
//! unique by name alone, villages by name within their chiefdom.

use kin_core::geo::{ChiefdomId, GeoKind, GeoName};
use rusqlite::{Connection, ErrorCode, OptionalExtension as _, ToSql};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoTarget {
  Chiefdom,
  Village { chiefdom_id: ChiefdomId },
  Location,
}

/// Table layout shared by the three geo-entity kinds.
pub(crate) struct GeoTable {
  pub(crate) table:        &'static str,
  pub(crate) id_column:    &'static str,
  pub(crate) scope_column: Option<&'static str>,
}

impl GeoTable {
  pub(crate) fn of(kind: GeoKind) -> Self {
    match kind {
      GeoKind::Chiefdom => GeoTable {
        table:        "chiefdoms",
        id_column:    "chiefdom_id",
        scope_column: None,
      },
      GeoKind::Village => GeoTable {
        table:        "villages",
        id_column:    "village_id",
        scope_column: Some("chiefdom_id"),
      },
      GeoKind::Location => GeoTable {
        table:        "locations",
        id_column:    "location_id",
        scope_column: None,
      },
    }
  }
}

impl GeoTarget {
  pub fn kind(self) -> GeoKind {
    match self {
      GeoTarget::Chiefdom => GeoKind::Chiefdom,
      GeoTarget::Village { .. } => GeoKind::Village,
      GeoTarget::Location => GeoKind::Location,
    }
  }

  fn table(self) -> GeoTable { GeoTable::of(self.kind()) }

  fn scope(self) -> Option<ChiefdomId> {
    match self {
      GeoTarget::Village { chiefdom_id } => Some(chiefdom_id),
      _ => None,
    }
  }
}

/// Return the id of the entity named `name` within `target`, creating it with
/// `name`'s casing if none exists. The flag is `true` when this call created
/// the row.
pub fn resolve(
  conn: &Connection,
  target: GeoTarget,
  name: &GeoName,
) -> rusqlite::Result<(i64, bool)> {
  match lookup(conn, target, name)? {
    Some(id) => Ok((id, false)),
    None => create_or_reread(conn, target, name),
  }
}

/// Insert `name` under `target`. If the insert hits the uniqueness constraint
/// (another writer created the same name since the lookup), the existing row
/// is read back once instead.
fn create_or_reread(
  conn: &Connection,
  target: GeoTarget,
  name: &GeoName,
) -> rusqlite::Result<(i64, bool)> {
  match insert(conn, target, name) {
    Ok(id) => {
      tracing::debug!(kind = %target.kind(), id, name = name.display(), "created geo entity");
      Ok((id, true))
    }
    Err(e) if is_unique_violation(&e) => {
      tracing::debug!(kind = %target.kind(), name = name.display(), "lost create race; re-reading");
      match lookup(conn, target, name)? {
        Some(id) => Ok((id, false)),
        None => Err(e),
      }
    }
    Err(e) => Err(e),
  }
}

fn lookup(
  conn: &Connection,
  target: GeoTarget,
  name: &GeoName,
) -> rusqlite::Result<Option<i64>> {
  let t = target.table();
  let mut sql = format!(
    "SELECT {} FROM {} WHERE name_key = ?1",
    t.id_column, t.table
  );
  if let Some(col) = t.scope_column {
    sql.push_str(&format!(" AND {col} = ?2"));
  }

  let key = name.key();
  let scope = target.scope();
  let params: Vec<&dyn ToSql> = match &scope {
    Some(s) => vec![&key as &dyn ToSql, s],
    None => vec![&key as &dyn ToSql],
  };

  conn
    .query_row(&sql, params.as_slice(), |row| row.get(0))
    .optional()
}

fn insert(
  conn: &Connection,
  target: GeoTarget,
  name: &GeoName,
) -> rusqlite::Result<i64> {
  let t = target.table();
  let display = name.display();
  let key = name.key();
  let scope = target.scope();

  let (sql, params): (String, Vec<&dyn ToSql>) = match (&scope, t.scope_column) {
    (Some(s), Some(col)) => (
      format!("INSERT INTO {} (name, name_key, {col}) VALUES (?1, ?2, ?3)", t.table),
      vec![&display as &dyn ToSql, &key, s],
    ),
    _ => (
      format!("INSERT INTO {} (name, name_key) VALUES (?1, ?2)", t.table),
      vec![&display as &dyn ToSql, &key],
    ),
  };

  conn.execute(&sql, params.as_slice())?;
  Ok(conn.last_insert_rowid())
}

/// `true` for UNIQUE / PRIMARY KEY violations.
pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.code == ErrorCode::ConstraintViolation
        && matches!(
          err.extended_code,
          rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        )
  )
}
