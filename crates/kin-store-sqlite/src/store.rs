//! [`SqliteStore`]: the SQLite implementation of [`FamilyStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::{
  Connection, OptionalExtension as _, ToSql, TransactionBehavior,
  types::Value,
};

use kin_core::{
  family_tree::{self, FamilyTree, FamilyTreeId, FamilyTreePatch, NewFamilyTree},
  geo::{
    Chiefdom, ChiefdomId, ChiefdomRef, GeoKind, GeoName, Location, LocationId,
    Resolved, Village, VillageId, VillageInput, VillagePatch, fold,
    village_chiefdom,
  },
  person::{NewPerson, Person, PersonId, PersonPatch},
  store::FamilyStore,
  user::{Credentials, NewUser, Owner, User, UserId},
  validate::{RelationChanges, validate_relations},
};

use crate::{
  Error, Result,
  encode::{
    PERSON_COLUMNS, PERSON_FROM, RawPerson, RawUser, decode_dt, encode_date,
    encode_dt, encode_gender,
  },
  error::TxError,
  normalize::{GeoTable, GeoTarget, is_unique_violation, resolve},
  schema::SCHEMA,
};

type TxResult<T> = std::result::Result<T, TxError>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Kin store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the database thread outside a transaction.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> TxResult<T> + Send + 'static,
  {
    let outcome = self.conn.call(move |conn| Ok(f(&*conn))).await?;
    Ok(outcome?)
  }

  /// Run `f` inside an `IMMEDIATE` transaction, committing only if it
  /// succeeds. Any error, domain or SQL, rolls back every statement `f` ran.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> TxResult<T> + Send + 'static,
  {
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx);
        if out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await?;
    Ok(outcome?)
  }
}

// ─── Person helpers ──────────────────────────────────────────────────────────

/// Load persons matching `where_sql` (written against alias `p`), ordered by
/// id, with spouse ids attached.
fn load_persons(
  conn: &Connection,
  where_sql: &str,
  params: &[&dyn ToSql],
) -> TxResult<Vec<Person>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {PERSON_COLUMNS} {PERSON_FROM} WHERE {where_sql} ORDER BY p.person_id"
  ))?;
  let raws = stmt
    .query_map(params, RawPerson::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  if raws.is_empty() {
    return Ok(Vec::new());
  }

  let mut stmt = conn.prepare(&format!(
    "SELECT person_a, person_b FROM spouses
     WHERE person_a IN (SELECT p.person_id FROM persons p WHERE {where_sql})
        OR person_b IN (SELECT p.person_id FROM persons p WHERE {where_sql})"
  ))?;
  let mut spouses: HashMap<PersonId, Vec<PersonId>> = HashMap::new();
  let edges = stmt
    .query_map(params, |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  for (a, b) in edges {
    spouses.entry(a).or_default().push(b);
    spouses.entry(b).or_default().push(a);
  }

  raws
    .into_iter()
    .map(|raw| raw.into_person(&spouses).map_err(TxError::from))
    .collect()
}

fn load_person(conn: &Connection, owner: Owner, id: PersonId) -> TxResult<Option<Person>> {
  let owner_id = owner.user_id();
  Ok(
    load_persons(conn, "p.owner_id = ?1 AND p.person_id = ?2", &[&owner_id, &id])?
      .pop(),
  )
}

fn person_exists(conn: &Connection, owner: Owner, id: PersonId) -> TxResult<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM persons WHERE person_id = ?1 AND owner_id = ?2",
        rusqlite::params![id, owner.user_id()],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

/// A relation on `field` may only point at an existing person of `owner`.
fn require_reference(
  conn: &Connection,
  owner: Owner,
  field: &'static str,
  id: PersonId,
) -> TxResult<()> {
  if person_exists(conn, owner, id)? {
    Ok(())
  } else {
    Err(kin_core::Error::UnknownReference { field, id }.into())
  }
}

fn stored_chiefdom(conn: &Connection, id: PersonId) -> TxResult<Option<ChiefdomId>> {
  Ok(
    conn
      .query_row(
        "SELECT chiefdom_id FROM persons WHERE person_id = ?1",
        [id],
        |row| row.get::<_, Option<i64>>(0),
      )
      .optional()?
      .flatten(),
  )
}

fn insert_spouse_edge(conn: &Connection, a: PersonId, b: PersonId) -> TxResult<()> {
  conn.execute(
    "INSERT OR IGNORE INTO spouses (person_a, person_b) VALUES (?1, ?2)",
    [a.min(b), a.max(b)],
  )?;
  Ok(())
}

fn parse_optional_name(
  field: &'static str,
  value: &Option<Option<String>>,
) -> TxResult<Option<Option<GeoName>>> {
  Ok(match value {
    Some(Some(raw)) => Some(Some(GeoName::parse(field, raw)?)),
    Some(None) => Some(None),
    None => None,
  })
}

fn resolve_chiefdom_ref(conn: &Connection, parent: &ChiefdomRef) -> TxResult<ChiefdomId> {
  Ok(match parent {
    ChiefdomRef::Named(name) => resolve(conn, GeoTarget::Chiefdom, name)?.0,
    ChiefdomRef::Existing(id) => *id,
  })
}

fn id_value(id: Option<i64>) -> Value { id.map_or(Value::Null, Value::Integer) }

/// Apply `patch` to person `id`.
///
/// Every check (self-references, geo names, the village's chiefdom, and
/// referenced people) runs before the first write.
fn apply_patch(
  conn: &Connection,
  owner: Owner,
  id: PersonId,
  patch: PersonPatch,
) -> TxResult<()> {
  validate_relations(Some(id), &patch.relation_changes())?;

  let chiefdom = parse_optional_name("chiefdom_of_origin", &patch.chiefdom_of_origin)?;
  let location = parse_optional_name("current_location", &patch.current_location)?;
  let village = match &patch.village_of_origin {
    Some(Some(input)) => {
      let name = GeoName::parse("village_of_origin", &input.name)?;
      let fallback = match &chiefdom {
        Some(Some(name)) => Some(ChiefdomRef::Named(name.clone())),
        Some(None) => None,
        None => stored_chiefdom(conn, id)?.map(ChiefdomRef::Existing),
      };
      let parent =
        village_chiefdom("chiefdom_of_origin", input.chiefdom.as_deref(), fallback)?;
      Some(Some((name, parent)))
    }
    Some(None) => Some(None),
    None => None,
  };

  if let Some(Some(mother)) = patch.mother {
    require_reference(conn, owner, "mother", mother)?;
  }
  if let Some(Some(father)) = patch.father {
    require_reference(conn, owner, "father", father)?;
  }
  if let Some(spouses) = &patch.spouses {
    for &spouse in spouses {
      require_reference(conn, owner, "spouses", spouse)?;
    }
  }

  let mut sets: Vec<(&'static str, Value)> = Vec::new();
  if let Some(first_name) = patch.first_name {
    sets.push(("first_name", Value::Text(first_name)));
  }
  if let Some(last_name) = patch.last_name {
    sets.push(("last_name_key", Value::Text(fold(&last_name))));
    sets.push(("last_name", Value::Text(last_name)));
  }
  if let Some(gender) = patch.gender {
    sets.push((
      "gender",
      gender.map_or(Value::Null, |g| Value::Text(encode_gender(&g).to_owned())),
    ));
  }
  if let Some(dob) = patch.date_of_birth {
    sets.push(("date_of_birth", dob.map_or(Value::Null, |d| Value::Text(encode_date(d)))));
  }
  if let Some(dod) = patch.date_of_death {
    sets.push(("date_of_death", dod.map_or(Value::Null, |d| Value::Text(encode_date(d)))));
  }
  if let Some(history) = patch.history {
    sets.push(("history", Value::Text(history)));
  }
  if let Some(mother) = patch.mother {
    sets.push(("mother_id", id_value(mother)));
  }
  if let Some(father) = patch.father {
    sets.push(("father_id", id_value(father)));
  }
  if let Some(chiefdom) = chiefdom {
    let cid = chiefdom
      .map(|name| resolve(conn, GeoTarget::Chiefdom, &name).map(|(id, _)| id))
      .transpose()?;
    sets.push(("chiefdom_id", id_value(cid)));
  }
  if let Some(village) = village {
    let vid = match village {
      Some((name, parent)) => {
        let chiefdom_id = resolve_chiefdom_ref(conn, &parent)?;
        Some(resolve(conn, GeoTarget::Village { chiefdom_id }, &name)?.0)
      }
      None => None,
    };
    sets.push(("village_id", id_value(vid)));
  }
  if let Some(location) = location {
    let lid = location
      .map(|name| resolve(conn, GeoTarget::Location, &name).map(|(id, _)| id))
      .transpose()?;
    sets.push(("location_id", id_value(lid)));
  }

  if !sets.is_empty() {
    let assignments = sets
      .iter()
      .enumerate()
      .map(|(i, (col, _))| format!("{col} = ?{}", i + 1))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "UPDATE persons SET {assignments} WHERE person_id = ?{}",
      sets.len() + 1
    );
    let values = sets
      .into_iter()
      .map(|(_, v)| v)
      .chain(std::iter::once(Value::Integer(id)));
    conn.execute(&sql, rusqlite::params_from_iter(values))?;
  }

  if let Some(spouses) = patch.spouses {
    conn.execute(
      "DELETE FROM spouses WHERE person_a = ?1 OR person_b = ?1",
      [id],
    )?;
    for spouse in spouses {
      insert_spouse_edge(conn, id, spouse)?;
    }
  }

  Ok(())
}

/// Load a person that must exist after a write.
fn reload_person(conn: &Connection, owner: Owner, id: PersonId) -> TxResult<Person> {
  load_person(conn, owner, id)?
    .ok_or_else(|| kin_core::Error::PersonNotFound(id).into())
}

// ─── Geo helpers ─────────────────────────────────────────────────────────────

fn like_pattern(search: &str) -> String { format!("%{}%", fold(search)) }

/// List `(id, name)` rows of a globally named table (chiefdoms, locations).
fn list_named(
  conn: &Connection,
  kind: GeoKind,
  search: Option<String>,
) -> TxResult<Vec<(i64, String)>> {
  let GeoTable { table, id_column, .. } = GeoTable::of(kind);
  let pattern = search.as_deref().map(like_pattern);
  let filter = if pattern.is_some() { "WHERE name_key LIKE ?1" } else { "" };
  let mut stmt = conn.prepare(&format!(
    "SELECT {id_column}, name FROM {table} {filter} ORDER BY {id_column}"
  ))?;
  let params: Vec<&dyn ToSql> = match &pattern {
    Some(p) => vec![p as &dyn ToSql],
    None => vec![],
  };
  let rows = stmt
    .query_map(params.as_slice(), |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn get_named(conn: &Connection, kind: GeoKind, id: i64) -> TxResult<Option<(i64, String)>> {
  let GeoTable { table, id_column, .. } = GeoTable::of(kind);
  Ok(
    conn
      .query_row(
        &format!("SELECT {id_column}, name FROM {table} WHERE {id_column} = ?1"),
        [id],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()?,
  )
}

fn rename_named(
  conn: &Connection,
  kind: GeoKind,
  id: i64,
  raw: &str,
) -> TxResult<(i64, String)> {
  let name = GeoName::parse("name", raw)?;
  let GeoTable { table, id_column, .. } = GeoTable::of(kind);
  let updated = conn.execute(
    &format!("UPDATE {table} SET name = ?1, name_key = ?2 WHERE {id_column} = ?3"),
    rusqlite::params![name.display(), name.key(), id],
  );
  match updated {
    Ok(0) => Err(kin_core::Error::GeoNotFound { kind, id }.into()),
    Ok(_) => Ok((id, name.display().to_owned())),
    Err(e) if is_unique_violation(&e) => Err(
      kin_core::Error::GeoNameTaken { kind, name: name.display().to_owned() }.into(),
    ),
    Err(e) => Err(e.into()),
  }
}

fn delete_geo(conn: &Connection, kind: GeoKind, id: i64) -> TxResult<bool> {
  let GeoTable { table, id_column, .. } = GeoTable::of(kind);
  let n = conn.execute(&format!("DELETE FROM {table} WHERE {id_column} = ?1"), [id])?;
  Ok(n > 0)
}

const VILLAGE_SELECT: &str = "
  SELECT v.village_id, v.name, c.chiefdom_id, c.name
  FROM villages v
  JOIN chiefdoms c ON c.chiefdom_id = v.chiefdom_id";

fn village_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Village> {
  Ok(Village {
    id:       row.get(0)?,
    name:     row.get(1)?,
    chiefdom: Chiefdom { id: row.get(2)?, name: row.get(3)? },
  })
}

fn load_village(conn: &Connection, id: VillageId) -> TxResult<Option<Village>> {
  Ok(
    conn
      .query_row(
        &format!("{VILLAGE_SELECT} WHERE v.village_id = ?1"),
        [id],
        village_from_row,
      )
      .optional()?,
  )
}

fn chiefdom_of((id, name): (i64, String)) -> Chiefdom { Chiefdom { id, name } }

fn location_of((id, name): (i64, String)) -> Location { Location { id, name } }

// ─── Family tree helpers ─────────────────────────────────────────────────────

fn load_family_trees(
  conn: &Connection,
  owner: Owner,
  id: Option<FamilyTreeId>,
) -> TxResult<Vec<FamilyTree>> {
  let owner_id = owner.user_id();
  let mut stmt = conn.prepare(
    "SELECT tree_id, owner_id, name, description, created_at
     FROM family_trees
     WHERE owner_id = ?1 AND (?2 IS NULL OR tree_id = ?2)
     ORDER BY tree_id",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![owner_id, id], |row| {
      Ok((
        row.get::<_, i64>(0)?,
        row.get::<_, i64>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, String>(3)?,
        row.get::<_, String>(4)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut trees = Vec::with_capacity(rows.len());
  for (tree_id, owner, name, description, created_at) in rows {
    let members = load_persons(
      conn,
      "p.person_id IN (SELECT person_id FROM family_tree_members WHERE tree_id = ?1)",
      &[&tree_id],
    )?;
    trees.push(FamilyTree {
      id: tree_id,
      owner,
      name,
      description,
      members,
      created_at: decode_dt(&created_at)?,
    });
  }
  Ok(trees)
}

fn set_family_tree_members(
  conn: &Connection,
  owner: Owner,
  tree_id: FamilyTreeId,
  members: &[PersonId],
) -> TxResult<()> {
  for &person in members {
    require_reference(conn, owner, "members", person)?;
  }
  conn.execute("DELETE FROM family_tree_members WHERE tree_id = ?1", [tree_id])?;
  for &person in members {
    conn.execute(
      "INSERT OR IGNORE INTO family_tree_members (tree_id, person_id) VALUES (?1, ?2)",
      [tree_id, person],
    )?;
  }
  Ok(())
}

fn reload_family_tree(conn: &Connection, owner: Owner, id: FamilyTreeId) -> TxResult<FamilyTree> {
  load_family_trees(conn, owner, Some(id))?
    .pop()
    .ok_or_else(|| kin_core::Error::FamilyTreeNotFound(id).into())
}

// ─── FamilyStore impl ────────────────────────────────────────────────────────

impl FamilyStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let created_at = Utc::now();
    let at_str = encode_dt(created_at);
    self
      .write(move |conn| {
        let NewUser { username, email, password_hash } = input;
        let inserted = conn.execute(
          "INSERT INTO users (username, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![username, email.trim(), password_hash, at_str],
        );
        match inserted {
          Ok(_) => Ok(User {
            id: conn.last_insert_rowid(),
            username,
            email: email.trim().to_owned(),
            created_at,
          }),
          Err(e) if is_unique_violation(&e) => {
            Err(kin_core::Error::UsernameTaken(username).into())
          }
          Err(e) => Err(e.into()),
        }
      })
      .await
  }

  async fn user_credentials(&self, username: String) -> Result<Option<Credentials>> {
    self
      .read(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {} FROM users WHERE username = ?1", RawUser::COLUMNS),
            [username],
            RawUser::from_row,
          )
          .optional()?;
        Ok(raw.map(RawUser::into_credentials).transpose()?)
      })
      .await
  }

  async fn get_user(&self, id: UserId) -> Result<Option<User>> {
    self
      .read(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {} FROM users WHERE user_id = ?1", RawUser::COLUMNS),
            [id],
            RawUser::from_row,
          )
          .optional()?;
        Ok(raw.map(RawUser::into_user).transpose()?)
      })
      .await
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    self
      .read(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM users ORDER BY user_id",
          RawUser::COLUMNS
        ))?;
        let raws = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(raws.into_iter().map(RawUser::into_user).collect::<Result<_>>()?)
      })
      .await
  }

  async fn delete_user(&self, id: UserId) -> Result<bool> {
    self
      .write(move |conn| {
        Ok(conn.execute("DELETE FROM users WHERE user_id = ?1", [id])? > 0)
      })
      .await
  }

  // ── Persons ───────────────────────────────────────────────────────────────

  async fn list_persons(&self, owner: Owner) -> Result<Vec<Person>> {
    self
      .read(move |conn| {
        load_persons(conn, "p.owner_id = ?1", &[&owner.user_id()])
      })
      .await
  }

  async fn get_person(&self, owner: Owner, id: PersonId) -> Result<Option<Person>> {
    self.read(move |conn| load_person(conn, owner, id)).await
  }

  async fn create_person(&self, owner: Owner, input: NewPerson) -> Result<Person> {
    let at_str = encode_dt(Utc::now());
    self
      .write(move |conn| {
        conn.execute(
          "INSERT INTO persons (owner_id, created_at) VALUES (?1, ?2)",
          rusqlite::params![owner.user_id(), at_str],
        )?;
        let id = conn.last_insert_rowid();
        apply_patch(conn, owner, id, PersonPatch::from(input))?;
        reload_person(conn, owner, id)
      })
      .await
  }

  async fn update_person(
    &self,
    owner: Owner,
    id: PersonId,
    patch: PersonPatch,
  ) -> Result<Person> {
    self
      .write(move |conn| {
        if !person_exists(conn, owner, id)? {
          return Err(kin_core::Error::PersonNotFound(id).into());
        }
        apply_patch(conn, owner, id, patch)?;
        reload_person(conn, owner, id)
      })
      .await
  }

  async fn delete_person(&self, owner: Owner, id: PersonId) -> Result<bool> {
    self
      .write(move |conn| {
        let n = conn.execute(
          "DELETE FROM persons WHERE person_id = ?1 AND owner_id = ?2",
          rusqlite::params![id, owner.user_id()],
        )?;
        Ok(n > 0)
      })
      .await
  }

  async fn add_spouse(&self, owner: Owner, id: PersonId, spouse: PersonId) -> Result<Person> {
    self
      .write(move |conn| {
        validate_relations(
          Some(id),
          &RelationChanges { spouses: Some(&[spouse]), ..Default::default() },
        )?;
        if !person_exists(conn, owner, id)? {
          return Err(kin_core::Error::PersonNotFound(id).into());
        }
        require_reference(conn, owner, "spouses", spouse)?;
        insert_spouse_edge(conn, id, spouse)?;
        reload_person(conn, owner, id)
      })
      .await
  }

  async fn remove_spouse(
    &self,
    owner: Owner,
    id: PersonId,
    spouse: PersonId,
  ) -> Result<Person> {
    self
      .write(move |conn| {
        if !person_exists(conn, owner, id)? {
          return Err(kin_core::Error::PersonNotFound(id).into());
        }
        conn.execute(
          "DELETE FROM spouses WHERE person_a = ?1 AND person_b = ?2",
          [id.min(spouse), id.max(spouse)],
        )?;
        reload_person(conn, owner, id)
      })
      .await
  }

  async fn clan_members(&self, owner: Owner, surname: String) -> Result<Vec<Person>> {
    let key = fold(&surname);
    self
      .read(move |conn| {
        load_persons(
          conn,
          "p.owner_id = ?1 AND p.last_name_key = ?2",
          &[&owner.user_id(), &key],
        )
      })
      .await
  }

  // ── Chiefdoms ─────────────────────────────────────────────────────────────

  async fn list_chiefdoms(&self, search: Option<String>) -> Result<Vec<Chiefdom>> {
    self
      .read(move |conn| {
        Ok(
          list_named(conn, GeoKind::Chiefdom, search)?
            .into_iter()
            .map(chiefdom_of)
            .collect(),
        )
      })
      .await
  }

  async fn get_chiefdom(&self, id: ChiefdomId) -> Result<Option<Chiefdom>> {
    self
      .read(move |conn| Ok(get_named(conn, GeoKind::Chiefdom, id)?.map(chiefdom_of)))
      .await
  }

  async fn resolve_chiefdom(&self, name: String) -> Result<Resolved<Chiefdom>> {
    self
      .write(move |conn| {
        let name = GeoName::parse("name", &name)?;
        let (id, created) = resolve(conn, GeoTarget::Chiefdom, &name)?;
        let entity = get_named(conn, GeoKind::Chiefdom, id)?
          .map(chiefdom_of)
          .ok_or(kin_core::Error::GeoNotFound { kind: GeoKind::Chiefdom, id })?;
        Ok(Resolved { entity, created })
      })
      .await
  }

  async fn rename_chiefdom(&self, id: ChiefdomId, name: String) -> Result<Chiefdom> {
    self
      .write(move |conn| Ok(chiefdom_of(rename_named(conn, GeoKind::Chiefdom, id, &name)?)))
      .await
  }

  async fn delete_chiefdom(&self, id: ChiefdomId) -> Result<bool> {
    self
      .write(move |conn| delete_geo(conn, GeoKind::Chiefdom, id))
      .await
  }

  // ── Villages ──────────────────────────────────────────────────────────────

  async fn list_villages(&self, search: Option<String>) -> Result<Vec<Village>> {
    self
      .read(move |conn| {
        let pattern = search.as_deref().map(like_pattern);
        let filter = if pattern.is_some() {
          "WHERE v.name_key LIKE ?1 OR c.name_key LIKE ?1"
        } else {
          ""
        };
        let mut stmt =
          conn.prepare(&format!("{VILLAGE_SELECT} {filter} ORDER BY v.village_id"))?;
        let params: Vec<&dyn ToSql> = match &pattern {
          Some(p) => vec![p as &dyn ToSql],
          None => vec![],
        };
        let villages = stmt
          .query_map(params.as_slice(), village_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(villages)
      })
      .await
  }

  async fn get_village(&self, id: VillageId) -> Result<Option<Village>> {
    self.read(move |conn| load_village(conn, id)).await
  }

  async fn resolve_village(&self, input: VillageInput) -> Result<Resolved<Village>> {
    self
      .write(move |conn| {
        let name = GeoName::parse("name", &input.name)?;
        let parent = village_chiefdom("chiefdom", input.chiefdom.as_deref(), None)?;
        let chiefdom_id = resolve_chiefdom_ref(conn, &parent)?;
        let (id, created) = resolve(conn, GeoTarget::Village { chiefdom_id }, &name)?;
        let entity = load_village(conn, id)?
          .ok_or(kin_core::Error::GeoNotFound { kind: GeoKind::Village, id })?;
        Ok(Resolved { entity, created })
      })
      .await
  }

  async fn update_village(&self, id: VillageId, patch: VillagePatch) -> Result<Village> {
    self
      .write(move |conn| {
        let current = load_village(conn, id)?
          .ok_or(kin_core::Error::GeoNotFound { kind: GeoKind::Village, id })?;
        let name = patch
          .name
          .as_deref()
          .map(|raw| GeoName::parse("name", raw))
          .transpose()?;
        let chiefdom = patch
          .chiefdom
          .as_deref()
          .map(|raw| GeoName::parse("chiefdom", raw))
          .transpose()?;

        let chiefdom_id = match &chiefdom {
          Some(name) => resolve(conn, GeoTarget::Chiefdom, name)?.0,
          None => current.chiefdom.id,
        };
        let (display, key) = match &name {
          Some(name) => (name.display().to_owned(), name.key().to_owned()),
          None => (current.name.clone(), fold(&current.name)),
        };

        let updated = conn.execute(
          "UPDATE villages SET name = ?1, name_key = ?2, chiefdom_id = ?3 WHERE village_id = ?4",
          rusqlite::params![display, key, chiefdom_id, id],
        );
        match updated {
          Ok(_) => {}
          Err(e) if is_unique_violation(&e) => {
            return Err(
              kin_core::Error::GeoNameTaken { kind: GeoKind::Village, name: display }.into(),
            );
          }
          Err(e) => return Err(e.into()),
        }

        load_village(conn, id)?
          .ok_or_else(|| kin_core::Error::GeoNotFound { kind: GeoKind::Village, id }.into())
      })
      .await
  }

  async fn delete_village(&self, id: VillageId) -> Result<bool> {
    self
      .write(move |conn| delete_geo(conn, GeoKind::Village, id))
      .await
  }

  // ── Locations ─────────────────────────────────────────────────────────────

  async fn list_locations(&self, search: Option<String>) -> Result<Vec<Location>> {
    self
      .read(move |conn| {
        Ok(
          list_named(conn, GeoKind::Location, search)?
            .into_iter()
            .map(location_of)
            .collect(),
        )
      })
      .await
  }

  async fn get_location(&self, id: LocationId) -> Result<Option<Location>> {
    self
      .read(move |conn| Ok(get_named(conn, GeoKind::Location, id)?.map(location_of)))
      .await
  }

  async fn resolve_location(&self, name: String) -> Result<Resolved<Location>> {
    self
      .write(move |conn| {
        let name = GeoName::parse("name", &name)?;
        let (id, created) = resolve(conn, GeoTarget::Location, &name)?;
        let entity = get_named(conn, GeoKind::Location, id)?
          .map(location_of)
          .ok_or(kin_core::Error::GeoNotFound { kind: GeoKind::Location, id })?;
        Ok(Resolved { entity, created })
      })
      .await
  }

  async fn rename_location(&self, id: LocationId, name: String) -> Result<Location> {
    self
      .write(move |conn| Ok(location_of(rename_named(conn, GeoKind::Location, id, &name)?)))
      .await
  }

  async fn delete_location(&self, id: LocationId) -> Result<bool> {
    self
      .write(move |conn| delete_geo(conn, GeoKind::Location, id))
      .await
  }

  // ── Family trees ──────────────────────────────────────────────────────────

  async fn list_family_trees(&self, owner: Owner) -> Result<Vec<FamilyTree>> {
    self.read(move |conn| load_family_trees(conn, owner, None)).await
  }

  async fn get_family_tree(&self, owner: Owner, id: FamilyTreeId) -> Result<Option<FamilyTree>> {
    self
      .read(move |conn| Ok(load_family_trees(conn, owner, Some(id))?.pop()))
      .await
  }

  async fn create_family_tree(&self, owner: Owner, input: NewFamilyTree) -> Result<FamilyTree> {
    let at_str = encode_dt(Utc::now());
    self
      .write(move |conn| {
        family_tree::check_name(&input.name)?;
        conn.execute(
          "INSERT INTO family_trees (owner_id, name, description, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![owner.user_id(), input.name, input.description, at_str],
        )?;
        let id = conn.last_insert_rowid();
        set_family_tree_members(conn, owner, id, &input.members)?;
        reload_family_tree(conn, owner, id)
      })
      .await
  }

  async fn update_family_tree(
    &self,
    owner: Owner,
    id: FamilyTreeId,
    patch: FamilyTreePatch,
  ) -> Result<FamilyTree> {
    self
      .write(move |conn| {
        if let Some(name) = &patch.name {
          family_tree::check_name(name)?;
        }
        let n = conn.execute(
          "UPDATE family_trees
           SET name = COALESCE(?1, name), description = COALESCE(?2, description)
           WHERE tree_id = ?3 AND owner_id = ?4",
          rusqlite::params![patch.name, patch.description, id, owner.user_id()],
        )?;
        if n == 0 {
          return Err(kin_core::Error::FamilyTreeNotFound(id).into());
        }
        if let Some(members) = &patch.members {
          set_family_tree_members(conn, owner, id, members)?;
        }
        reload_family_tree(conn, owner, id)
      })
      .await
  }

  async fn delete_family_tree(&self, owner: Owner, id: FamilyTreeId) -> Result<bool> {
    self
      .write(move |conn| {
        let n = conn.execute(
          "DELETE FROM family_trees WHERE tree_id = ?1 AND owner_id = ?2",
          rusqlite::params![id, owner.user_id()],
        )?;
        Ok(n > 0)
      })
      .await
  }
}
