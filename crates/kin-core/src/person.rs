//! Person records and the inputs that create and change them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
  geo::{Chiefdom, Location, Village, VillageInput},
  user::UserId,
  validate::RelationChanges,
};

pub type PersonId = i64;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum Gender {
  #[serde(rename = "M", alias = "male")]
  Male,
  #[serde(rename = "F", alias = "female")]
  Female,
  #[serde(rename = "O", alias = "other")]
  Other,
}

/// A family member as stored and returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub id:                 PersonId,
  /// The owning account.
  #[serde(rename = "user")]
  pub owner:              UserId,
  pub first_name:         String,
  pub last_name:          String,
  pub gender:             Option<Gender>,
  pub date_of_birth:      Option<NaiveDate>,
  pub date_of_death:      Option<NaiveDate>,
  pub history:            String,
  pub mother:             Option<PersonId>,
  pub father:             Option<PersonId>,
  /// Sorted ascending. The relation is symmetric.
  pub spouses:            Vec<PersonId>,
  pub chiefdom_of_origin: Option<Chiefdom>,
  pub village_of_origin:  Option<Village>,
  pub current_location:   Option<Location>,
  pub created_at:         DateTime<Utc>,
}

impl Person {
  /// `true` when neither parent is recorded.
  pub fn is_root(&self) -> bool {
    self.mother.is_none() && self.father.is_none()
  }

  /// The recorded parents, without duplicates.
  pub fn parents(&self) -> impl Iterator<Item = PersonId> + '_ {
    let father = self.father.filter(|f| Some(*f) != self.mother);
    self.mother.into_iter().chain(father)
  }
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// Body of a create (or full replace). The owner is never read from input.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPerson {
  #[serde(default)]
  pub first_name:         String,
  #[serde(default)]
  pub last_name:          String,
  #[serde(default)]
  pub gender:             Option<Gender>,
  #[serde(default)]
  pub date_of_birth:      Option<NaiveDate>,
  #[serde(default)]
  pub date_of_death:      Option<NaiveDate>,
  #[serde(default, alias = "bio")]
  pub history:            String,
  #[serde(default)]
  pub mother:             Option<PersonId>,
  #[serde(default)]
  pub father:             Option<PersonId>,
  #[serde(default)]
  pub spouses:            Vec<PersonId>,
  #[serde(default)]
  pub chiefdom_of_origin: Option<String>,
  #[serde(default)]
  pub village_of_origin:  Option<VillageInput>,
  #[serde(default)]
  pub current_location:   Option<String>,
}

impl NewPerson {
  pub fn named(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
    Self {
      first_name: first_name.into(),
      last_name: last_name.into(),
      ..Default::default()
    }
  }
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// A partial update. For nullable fields the outer `Option` says whether the
/// field was sent at all and the inner one carries an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonPatch {
  pub first_name:         Option<String>,
  pub last_name:          Option<String>,
  #[serde(default, deserialize_with = "present")]
  pub gender:             Option<Option<Gender>>,
  #[serde(default, deserialize_with = "present")]
  pub date_of_birth:      Option<Option<NaiveDate>>,
  #[serde(default, deserialize_with = "present")]
  pub date_of_death:      Option<Option<NaiveDate>>,
  #[serde(alias = "bio")]
  pub history:            Option<String>,
  #[serde(default, deserialize_with = "present")]
  pub mother:             Option<Option<PersonId>>,
  #[serde(default, deserialize_with = "present")]
  pub father:             Option<Option<PersonId>>,
  pub spouses:            Option<Vec<PersonId>>,
  #[serde(default, deserialize_with = "present")]
  pub chiefdom_of_origin: Option<Option<String>>,
  #[serde(default, deserialize_with = "present")]
  pub village_of_origin:  Option<Option<VillageInput>>,
  #[serde(default, deserialize_with = "present")]
  pub current_location:   Option<Option<String>>,
}

/// Marks a field as present, so `null` becomes `Some(None)` instead of `None`.
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
  T: Deserialize<'de>,
  D: Deserializer<'de>,
{
  T::deserialize(deserializer).map(Some)
}

impl PersonPatch {
  /// The relation values this patch proposes, for self-reference checks.
  pub fn relation_changes(&self) -> RelationChanges<'_> {
    RelationChanges {
      mother:  self.mother.flatten(),
      father:  self.father.flatten(),
      spouses: self.spouses.as_deref(),
    }
  }
}

/// A full record expressed as a patch touching every field.
impl From<NewPerson> for PersonPatch {
  fn from(p: NewPerson) -> Self {
    Self {
      first_name:         Some(p.first_name),
      last_name:          Some(p.last_name),
      gender:             Some(p.gender),
      date_of_birth:      Some(p.date_of_birth),
      date_of_death:      Some(p.date_of_death),
      history:            Some(p.history),
      mother:             Some(p.mother),
      father:             Some(p.father),
      spouses:            Some(p.spouses),
      chiefdom_of_origin: Some(p.chiefdom_of_origin),
      village_of_origin:  Some(p.village_of_origin),
      current_location:   Some(p.current_location),
    }
  }
}
