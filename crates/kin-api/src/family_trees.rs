//! Handlers for `/family-trees` endpoints: named, owner-scoped groupings of
//! people.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use kin_core::{
  family_tree::{FamilyTree, FamilyTreeId, FamilyTreePatch, NewFamilyTree},
  store::FamilyStore,
};

use crate::{ApiState, auth::Authenticated, error::ApiError, extract::JsonBody};

fn not_found(id: FamilyTreeId) -> ApiError {
  ApiError::store(kin_core::Error::FamilyTreeNotFound(id))
}

/// `GET /family-trees`
pub async fn list<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
) -> Result<Json<Vec<FamilyTree>>, ApiError> {
  let trees = state
    .store
    .list_family_trees(owner)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(trees))
}

/// `POST /family-trees`. Members are person ids; the owner is the caller.
pub async fn create<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
  JsonBody(body): JsonBody<NewFamilyTree>,
) -> Result<impl IntoResponse, ApiError> {
  let tree = state
    .store
    .create_family_tree(owner, body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(tree)))
}

/// `GET /family-trees/{id}`
pub async fn get_one<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
  Path(id): Path<FamilyTreeId>,
) -> Result<Json<FamilyTree>, ApiError> {
  state
    .store
    .get_family_tree(owner, id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| not_found(id))
}

/// `PATCH /family-trees/{id}`
pub async fn update<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
  Path(id): Path<FamilyTreeId>,
  JsonBody(patch): JsonBody<FamilyTreePatch>,
) -> Result<Json<FamilyTree>, ApiError> {
  let tree = state
    .store
    .update_family_tree(owner, id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(tree))
}

/// `DELETE /family-trees/{id}`
pub async fn delete<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
  Path(id): Path<FamilyTreeId>,
) -> Result<StatusCode, ApiError> {
  if state
    .store
    .delete_family_tree(owner, id)
    .await
    .map_err(ApiError::store)?
  {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(not_found(id))
  }
}
