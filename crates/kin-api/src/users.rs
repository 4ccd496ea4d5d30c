//! Read-only `/users` endpoints. Accounts are managed from the server binary.

use axum::{
  Json,
  extract::{Path, State},
};
use kin_core::{
  store::FamilyStore,
  user::{User, UserId},
};

use crate::{ApiState, auth::Authenticated, error::ApiError};

/// `GET /users`
pub async fn list<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
) -> Result<Json<Vec<User>>, ApiError> {
  let users = state.store.list_users().await.map_err(ApiError::store)?;
  Ok(Json(users))
}

/// `GET /users/{id}`
pub async fn get_one<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  _: Authenticated,
  Path(id): Path<UserId>,
) -> Result<Json<User>, ApiError> {
  let user = state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::store(kin_core::Error::UserNotFound(id)))?;
  Ok(Json(user))
}
