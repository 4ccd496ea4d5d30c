//! `GET /clans/{clan}/tree`: the paginated ancestry forest of one clan.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use kin_core::{
  page::{Page, paginate},
  store::FamilyStore,
  tree::{TreeNode, build_forest},
};
use serde::Deserialize;

use crate::{ApiState, auth::Authenticated, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct TreeParams {
  /// 1-based; defaults to the first page.
  #[serde(default = "first_page")]
  pub page: u32,
}

fn first_page() -> u32 { 1 }

/// `GET /clans/{clan}/tree[?page=N]`
///
/// Roots are clan members with no recorded parent, in id order; each page
/// holds up to `tree_page_size` roots with their full descendant subtrees.
pub async fn tree<S: FamilyStore>(
  State(state): State<ApiState<S>>,
  Authenticated(owner): Authenticated,
  Path(clan): Path<String>,
  Query(params): Query<TreeParams>,
) -> Result<Json<Page<TreeNode>>, ApiError> {
  if let Some(hit) = state.trees.get(owner, &clan, params.page) {
    return Ok(Json(hit));
  }

  let members = state
    .store
    .clan_members(owner, clan.clone())
    .await
    .map_err(ApiError::store)?;
  let forest = build_forest(&clan, members).map_err(ApiError::store)?;
  let page = paginate(forest, params.page, state.tree_page_size)
    .ok_or_else(|| ApiError::NotFound("Invalid page.".into()))?;

  state.trees.insert(owner, &clan, params.page, page.clone());
  Ok(Json(page))
}
