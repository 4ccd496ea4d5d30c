//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, calendar dates as `YYYY-MM-DD`
//! and genders as their lowercase names.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use kin_core::{
  geo::{Chiefdom, Location, Village},
  person::{Gender, Person, PersonId},
  user::{Credentials, User},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Gender ──────────────────────────────────────────────────────────────────

pub fn encode_gender(g: &Gender) -> &str { g.as_ref() }

pub fn decode_gender(s: &str) -> Result<Gender> {
  s.parse().map_err(|_| Error::UnknownGender(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawPerson::from_row`]; use with [`PERSON_FROM`].
pub const PERSON_COLUMNS: &str = "
  p.person_id, p.owner_id, p.first_name, p.last_name, p.gender,
  p.date_of_birth, p.date_of_death, p.history, p.mother_id, p.father_id,
  c.chiefdom_id, c.name,
  v.village_id, v.name, vc.chiefdom_id, vc.name,
  l.location_id, l.name,
  p.created_at";

/// `FROM` clause joining a person to its geo-entities.
pub const PERSON_FROM: &str = "
  FROM persons p
  LEFT JOIN chiefdoms c  ON c.chiefdom_id  = p.chiefdom_id
  LEFT JOIN villages  v  ON v.village_id   = p.village_id
  LEFT JOIN chiefdoms vc ON vc.chiefdom_id = v.chiefdom_id
  LEFT JOIN locations l  ON l.location_id  = p.location_id";

/// Raw values read directly from a `persons` row joined with its geo-entities.
pub struct RawPerson {
  pub person_id:     i64,
  pub owner_id:      i64,
  pub first_name:    String,
  pub last_name:     String,
  pub gender:        Option<String>,
  pub date_of_birth: Option<String>,
  pub date_of_death: Option<String>,
  pub history:       String,
  pub mother_id:     Option<i64>,
  pub father_id:     Option<i64>,
  // chiefdom of origin
  pub chiefdom_id:   Option<i64>,
  pub chiefdom_name: Option<String>,
  // village of origin and the village's own chiefdom
  pub village_id:    Option<i64>,
  pub village_name:  Option<String>,
  pub village_cd_id: Option<i64>,
  pub village_cd:    Option<String>,
  // current location
  pub location_id:   Option<i64>,
  pub location_name: Option<String>,
  pub created_at:    String,
}

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:     row.get(0)?,
      owner_id:      row.get(1)?,
      first_name:    row.get(2)?,
      last_name:     row.get(3)?,
      gender:        row.get(4)?,
      date_of_birth: row.get(5)?,
      date_of_death: row.get(6)?,
      history:       row.get(7)?,
      mother_id:     row.get(8)?,
      father_id:     row.get(9)?,
      chiefdom_id:   row.get(10)?,
      chiefdom_name: row.get(11)?,
      village_id:    row.get(12)?,
      village_name:  row.get(13)?,
      village_cd_id: row.get(14)?,
      village_cd:    row.get(15)?,
      location_id:   row.get(16)?,
      location_name: row.get(17)?,
      created_at:    row.get(18)?,
    })
  }

  /// Decode into a [`Person`], taking spouse ids from `spouses`.
  pub fn into_person(
    self,
    spouses: &HashMap<PersonId, Vec<PersonId>>,
  ) -> Result<Person> {
    let chiefdom_of_origin = match (self.chiefdom_id, self.chiefdom_name) {
      (Some(id), Some(name)) => Some(Chiefdom { id, name }),
      _ => None,
    };
    let village_of_origin = match (
      self.village_id,
      self.village_name,
      self.village_cd_id,
      self.village_cd,
    ) {
      (Some(id), Some(name), Some(cd_id), Some(cd_name)) => Some(Village {
        id,
        name,
        chiefdom: Chiefdom { id: cd_id, name: cd_name },
      }),
      _ => None,
    };
    let current_location = match (self.location_id, self.location_name) {
      (Some(id), Some(name)) => Some(Location { id, name }),
      _ => None,
    };

    let mut spouse_ids = spouses.get(&self.person_id).cloned().unwrap_or_default();
    spouse_ids.sort_unstable();

    Ok(Person {
      id: self.person_id,
      owner: self.owner_id,
      first_name: self.first_name,
      last_name: self.last_name,
      gender: self.gender.as_deref().map(decode_gender).transpose()?,
      date_of_birth: self.date_of_birth.as_deref().map(decode_date).transpose()?,
      date_of_death: self.date_of_death.as_deref().map(decode_date).transpose()?,
      history: self.history,
      mother: self.mother_id,
      father: self.father_id,
      spouses: spouse_ids,
      chiefdom_of_origin,
      village_of_origin,
      current_location,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:       i64,
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawUser {
  pub const COLUMNS: &'static str = "user_id, username, email, password_hash, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      email:         row.get(2)?,
      password_hash: row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  pub fn into_credentials(self) -> Result<Credentials> {
    Ok(Credentials {
      user:          User {
        id:         self.user_id,
        username:   self.username,
        email:      self.email,
        created_at: decode_dt(&self.created_at)?,
      },
      password_hash: self.password_hash,
    })
  }

  pub fn into_user(self) -> Result<User> {
    self.into_credentials().map(|c| c.user)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn date_roundtrip_format() {
    let d = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap();
    assert_eq!(encode_date(d), "1950-01-01");
    assert_eq!(decode_date("1950-01-01").unwrap(), d);
  }

  #[test]
  fn bad_date_is_reported() {
    assert!(matches!(decode_date("1950-13-01"), Err(Error::DateParse(_))));
  }

  #[test]
  fn gender_column_values() {
    for g in [Gender::Male, Gender::Female, Gender::Other] {
      assert_eq!(decode_gender(encode_gender(&g)).unwrap(), g);
    }
    assert_eq!(encode_gender(&Gender::Female), "female");
    assert!(matches!(decode_gender("x"), Err(Error::UnknownGender(_))));
  }
}
