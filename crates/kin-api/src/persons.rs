//! Handlers for `/persons` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/persons` | The caller's people, by id |
//! | `POST`   | `/persons` | Body: [`NewPerson`]; returns 201 |
//! | `GET`    | `/persons/{id}` | 404 if missing or not the caller's |
//! | `PUT`    | `/persons/{id}` | Full replace; omitted fields are cleared |
//! | `PATCH`  | `/persons/{id}` | Body: [`PersonPatch`] |
//! | `DELETE` | `/persons/{id}` | 204 |
//! | `POST`   | `/persons/{id}/spouses/{spouse_id}` | Adds the symmetric edge |
//! | `DELETE` | `/persons/{id}/spouses/{spouse_id}` | Removes it |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use kin_core::{
  person::{NewPerson, Person, PersonId, PersonPatch},
  store::FamilyStore,
};

use crate::{ApiState, auth::Authenticated, error::ApiError, extract::JsonBody};

/// `GET /persons`
pub async fn list<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
) -> Result<Json<Vec<Person>>, ApiError> {
  let persons = state.store.list_persons(owner).await.map_err(ApiError::store)?;
  Ok(Json(persons))
}

/// `POST /persons`
pub async fn create<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
  JsonBody(body): JsonBody<NewPerson>,
) -> Result<impl IntoResponse, ApiError> {
  let person = state
    .store
    .create_person(owner, body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(person)))
}

/// `GET /persons/{id}`
pub async fn get_one<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
  Path(id): Path<PersonId>,
) -> Result<Json<Person>, ApiError> {
  let person = state
    .store
    .get_person(owner, id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("person {id} not found")))?;
  Ok(Json(person))
}

/// `PUT /persons/{id}`
pub async fn replace<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
  Path(id): Path<PersonId>,
  JsonBody(body): JsonBody<NewPerson>,
) -> Result<Json<Person>, ApiError> {
  let person = state
    .store
    .update_person(owner, id, PersonPatch::from(body))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(person))
}

/// `PATCH /persons/{id}`
pub async fn update<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
  Path(id): Path<PersonId>,
  JsonBody(patch): JsonBody<PersonPatch>,
) -> Result<Json<Person>, ApiError> {
  let person = state
    .store
    .update_person(owner, id, patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(person))
}

/// `DELETE /persons/{id}`
pub async fn delete<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
  Path(id): Path<PersonId>,
) -> Result<StatusCode, ApiError> {
  if state.store.delete_person(owner, id).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("person {id} not found")))
  }
}

// ─── Spouses ─────────────────────────────────────────────────────────────────

/// `POST /persons/{id}/spouses/{spouse_id}`
pub async fn add_spouse<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
  Path((id, spouse)): Path<(PersonId, PersonId)>,
) -> Result<Json<Person>, ApiError> {
  let person = state
    .store
    .add_spouse(owner, id, spouse)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(person))
}

/// `DELETE /persons/{id}/spouses/{spouse_id}`
pub async fn remove_spouse<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
  Path((id, spouse)): Path<(PersonId, PersonId)>,
) -> Result<Json<Person>, ApiError> {
  let person = state
    .store
    .remove_spouse(owner, id, spouse)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(person))
}
