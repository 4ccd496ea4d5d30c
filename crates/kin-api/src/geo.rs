//! Handlers for the shared geo-entities: `/chiefdoms`, `/villages` and
//! `/locations`.
//!
//! `POST` is a resolve-or-create: it answers 201 when the entity was created
//! and 200 when an entity with the same case-folded name already existed.
//! Geo-entities are not owned; any authenticated user may read and edit them.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use kin_core::{
  geo::{
    Chiefdom, ChiefdomId, GeoKind, Location, LocationId, NewGeoEntity,
    Resolved, Village, VillageId, VillageInput, VillagePatch,
  },
  store::FamilyStore,
};
use serde::Deserialize;

use crate::{ApiState, auth::Authenticated, error::ApiError, extract::JsonBody};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  /// Case-insensitive substring filter on the name.
  pub search: Option<String>,
}

impl SearchParams {
  fn term(self) -> Option<String> { self.search.filter(|s| !s.trim().is_empty()) }
}

fn resolved<T>(r: Resolved<T>) -> (StatusCode, Json<T>) {
  let status = if r.created { StatusCode::CREATED } else { StatusCode::OK };
  (status, Json(r.entity))
}

fn not_found(kind: GeoKind, id: i64) -> ApiError {
  ApiError::store(kin_core::Error::GeoNotFound { kind, id })
}

fn deleted(found: bool, kind: GeoKind, id: i64) -> Result<StatusCode, ApiError> {
  if found { Ok(StatusCode::NO_CONTENT) } else { Err(not_found(kind, id)) }
}

// ─── Chiefdoms ───────────────────────────────────────────────────────────────

/// `GET /chiefdoms[?search=...]`
pub async fn list_chiefdoms<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Chiefdom>>, ApiError> {
  let chiefdoms = state
    .store
    .list_chiefdoms(params.term())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(chiefdoms))
}

/// `POST /chiefdoms`. Body: `{"name":"Chivero"}`
pub async fn create_chiefdom<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  JsonBody(body): JsonBody<NewGeoEntity>,
) -> Result<(StatusCode, Json<Chiefdom>), ApiError> {
  let r = state
    .store
    .resolve_chiefdom(body.name)
    .await
    .map_err(ApiError::store)?;
  Ok(resolved(r))
}

/// `GET /chiefdoms/{id}`
pub async fn get_chiefdom<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Path(id): Path<ChiefdomId>,
) -> Result<Json<Chiefdom>, ApiError> {
  state
    .store
    .get_chiefdom(id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| not_found(GeoKind::Chiefdom, id))
}

/// `PATCH /chiefdoms/{id}`. Body: `{"name":"..."}`; 409 if the new name is
/// already used by another chiefdom.
pub async fn rename_chiefdom<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Path(id): Path<ChiefdomId>,
  JsonBody(body): JsonBody<NewGeoEntity>,
) -> Result<Json<Chiefdom>, ApiError> {
  let chiefdom = state
    .store
    .rename_chiefdom(id, body.name)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(chiefdom))
}

/// `DELETE /chiefdoms/{id}`. Also deletes its villages.
pub async fn delete_chiefdom<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Path(id): Path<ChiefdomId>,
) -> Result<StatusCode, ApiError> {
  let found = state.store.delete_chiefdom(id).await.map_err(ApiError::store)?;
  deleted(found, GeoKind::Chiefdom, id)
}

// ─── Villages ────────────────────────────────────────────────────────────────

/// `GET /villages[?search=...]`. Matches the village or its chiefdom name.
pub async fn list_villages<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Village>>, ApiError> {
  let villages = state
    .store
    .list_villages(params.term())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(villages))
}

/// `POST /villages`. Body: `{"name":"Zvihwati","chiefdom":"Chivero"}`
pub async fn create_village<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  JsonBody(body): JsonBody<VillageInput>,
) -> Result<(StatusCode, Json<Village>), ApiError> {
  let r = state
    .store
    .resolve_village(body)
    .await
    .map_err(ApiError::store)?;
  Ok(resolved(r))
}

/// `GET /villages/{id}`
pub async fn get_village<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Path(id): Path<VillageId>,
) -> Result<Json<Village>, ApiError> {
  state
    .store
    .get_village(id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| not_found(GeoKind::Village, id))
}

/// `PATCH /villages/{id}`. Rename and/or move to another chiefdom.
pub async fn update_village<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Path(id): Path<VillageId>,
  JsonBody(patch): JsonBody<VillagePatch>,
) -> Result<Json<Village>, ApiError> {
  let village = state
    .store
    .update_village(id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(village))
}

/// `DELETE /villages/{id}`
pub async fn delete_village<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Path(id): Path<VillageId>,
) -> Result<StatusCode, ApiError> {
  let found = state.store.delete_village(id).await.map_err(ApiError::store)?;
  deleted(found, GeoKind::Village, id)
}

// ─── Locations ───────────────────────────────────────────────────────────────

/// `GET /locations[?search=...]`
pub async fn list_locations<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Location>>, ApiError> {
  let locations = state
    .store
    .list_locations(params.term())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(locations))
}

/// `POST /locations`. Body: `{"name":"Harare"}`
pub async fn create_location<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  JsonBody(body): JsonBody<NewGeoEntity>,
) -> Result<(StatusCode, Json<Location>), ApiError> {
  let r = state
    .store
    .resolve_location(body.name)
    .await
    .map_err(ApiError::store)?;
  Ok(resolved(r))
}

/// `GET /locations/{id}`
pub async fn get_location<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Path(id): Path<LocationId>,
) -> Result<Json<Location>, ApiError> {
  state
    .store
    .get_location(id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| not_found(GeoKind::Location, id))
}

/// `PATCH /locations/{id}`
pub async fn rename_location<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Path(id): Path<LocationId>,
  JsonBody(body): JsonBody<NewGeoEntity>,
) -> Result<Json<Location>, ApiError> {
  let location = state
    .store
    .rename_location(id, body.name)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(location))
}

/// `DELETE /locations/{id}`
pub async fn delete_location<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Path(id): Path<LocationId>,
) -> Result<StatusCode, ApiError> {
  let found = state.store.delete_location(id).await.map_err(ApiError::store)?;
  deleted(found, GeoKind::Location, id)
}
