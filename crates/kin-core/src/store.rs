//! The `FamilyStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `kin-store-sqlite`).
//! Higher layers (`kin-api`, `kin-server`) depend on this abstraction, not on
//! any concrete backend.
//!
//! Person and family-tree operations take an [`Owner`] and only ever see or
//! touch rows belonging to it; a row owned by someone else is reported exactly
//! like a missing one. Geo-entities are shared by all users.

use std::future::Future;

use crate::{
  error::DomainError,
  family_tree::{FamilyTree, FamilyTreeId, FamilyTreePatch, NewFamilyTree},
  geo::{
    Chiefdom, ChiefdomId, Location, LocationId, Resolved, Village, VillageId,
    VillageInput, VillagePatch,
  },
  person::{NewPerson, Person, PersonId, PersonPatch},
  user::{Credentials, NewUser, Owner, User, UserId},
};

/// Abstraction over a Kin storage backend.
///
/// Every write runs atomically: when a method fails, nothing it did is kept,
/// including geo-entities it would have created along the way.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait FamilyStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Register an account. Fails with `UsernameTaken` on a duplicate.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Look up an account and its password hash for authentication.
  fn user_credentials(
    &self,
    username: String,
  ) -> impl Future<Output = Result<Option<Credentials>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users(
    &self,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  /// Delete an account together with everything it owns. Returns `false` if
  /// there was no such account.
  fn delete_user(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Persons ───────────────────────────────────────────────────────────

  fn list_persons(
    &self,
    owner: Owner,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  fn get_person(
    &self,
    owner: Owner,
    id: PersonId,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Create a person owned by `owner`, resolving geo names and validating
  /// relations first.
  fn create_person(
    &self,
    owner: Owner,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Apply a partial update. Fields absent from `patch` keep their value.
  fn update_person(
    &self,
    owner: Owner,
    id: PersonId,
    patch: PersonPatch,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Delete a person. Children keep their record with the parent link
  /// cleared. Returns `false` if there was no such person.
  fn delete_person(
    &self,
    owner: Owner,
    id: PersonId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Record `id` and `spouse` as married; both sides see the edge.
  fn add_spouse(
    &self,
    owner: Owner,
    id: PersonId,
    spouse: PersonId,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// Remove the spouse edge between `id` and `spouse`, if any.
  fn remove_spouse(
    &self,
    owner: Owner,
    id: PersonId,
    spouse: PersonId,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// All persons of `owner` whose last name equals `surname`, ignoring case,
  /// ordered by id.
  fn clan_members(
    &self,
    owner: Owner,
    surname: String,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  // ── Chiefdoms ─────────────────────────────────────────────────────────

  /// List chiefdoms, optionally those whose name contains `search`.
  fn list_chiefdoms(
    &self,
    search: Option<String>,
  ) -> impl Future<Output = Result<Vec<Chiefdom>, Self::Error>> + Send + '_;

  fn get_chiefdom(
    &self,
    id: ChiefdomId,
  ) -> impl Future<Output = Result<Option<Chiefdom>, Self::Error>> + Send + '_;

  /// Get-or-create a chiefdom by case-insensitive name.
  fn resolve_chiefdom(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Resolved<Chiefdom>, Self::Error>> + Send + '_;

  fn rename_chiefdom(
    &self,
    id: ChiefdomId,
    name: String,
  ) -> impl Future<Output = Result<Chiefdom, Self::Error>> + Send + '_;

  /// Delete a chiefdom and its villages.
  fn delete_chiefdom(
    &self,
    id: ChiefdomId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Villages ──────────────────────────────────────────────────────────

  /// List villages; `search` matches the village or its chiefdom's name.
  fn list_villages(
    &self,
    search: Option<String>,
  ) -> impl Future<Output = Result<Vec<Village>, Self::Error>> + Send + '_;

  fn get_village(
    &self,
    id: VillageId,
  ) -> impl Future<Output = Result<Option<Village>, Self::Error>> + Send + '_;

  /// Get-or-create a village, resolving its chiefdom first.
  fn resolve_village(
    &self,
    input: VillageInput,
  ) -> impl Future<Output = Result<Resolved<Village>, Self::Error>> + Send + '_;

  fn update_village(
    &self,
    id: VillageId,
    patch: VillagePatch,
  ) -> impl Future<Output = Result<Village, Self::Error>> + Send + '_;

  fn delete_village(
    &self,
    id: VillageId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Locations ─────────────────────────────────────────────────────────

  fn list_locations(
    &self,
    search: Option<String>,
  ) -> impl Future<Output = Result<Vec<Location>, Self::Error>> + Send + '_;

  fn get_location(
    &self,
    id: LocationId,
  ) -> impl Future<Output = Result<Option<Location>, Self::Error>> + Send + '_;

  fn resolve_location(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Resolved<Location>, Self::Error>> + Send + '_;

  fn rename_location(
    &self,
    id: LocationId,
    name: String,
  ) -> impl Future<Output = Result<Location, Self::Error>> + Send + '_;

  fn delete_location(
    &self,
    id: LocationId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Family trees ──────────────────────────────────────────────────────

  fn list_family_trees(
    &self,
    owner: Owner,
  ) -> impl Future<Output = Result<Vec<FamilyTree>, Self::Error>> + Send + '_;

  fn get_family_tree(
    &self,
    owner: Owner,
    id: FamilyTreeId,
  ) -> impl Future<Output = Result<Option<FamilyTree>, Self::Error>> + Send + '_;

  fn create_family_tree(
    &self,
    owner: Owner,
    input: NewFamilyTree,
  ) -> impl Future<Output = Result<FamilyTree, Self::Error>> + Send + '_;

  fn update_family_tree(
    &self,
    owner: Owner,
    id: FamilyTreeId,
    patch: FamilyTreePatch,
  ) -> impl Future<Output = Result<FamilyTree, Self::Error>> + Send + '_;

  fn delete_family_tree(
    &self,
    owner: Owner,
    id: FamilyTreeId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
