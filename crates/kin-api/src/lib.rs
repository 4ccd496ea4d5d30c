//! JSON REST API for Kin.
//!
//! Exposes an axum [`Router`] backed by any [`kin_core::store::FamilyStore`].
//! Authentication is the caller's responsibility: the embedding server must
//! insert the authenticated [`kin_core::user::Owner`] into each request's
//! extensions, which handlers read through [`auth::Authenticated`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", kin_api::api_router(store.clone(), ApiOptions::default()))
//! ```

pub mod auth;
pub mod cache;
pub mod clans;
pub mod error;
pub mod extract;
pub mod family_trees;
pub mod geo;
pub mod persons;
pub mod users;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post},
};
use kin_core::store::FamilyStore;

pub use error::ApiError;

use cache::TreeCache;

/// Tunables for the API layer.
#[derive(Debug, Clone)]
pub struct ApiOptions {
  /// Roots per page of a clan tree.
  pub tree_page_size: usize,
  /// How long a rendered tree page is served from cache. Zero disables it.
  pub tree_cache_ttl: Duration,
}

impl Default for ApiOptions {
  fn default() -> Self {
    Self {
      tree_page_size: 10,
      tree_cache_ttl: Duration::from_secs(900),
    }
  }
}

/// State shared by all API handlers.
pub struct ApiState<S> {
  pub store:          Arc<S>,
  pub trees:          Arc<TreeCache>,
  pub tree_page_size: usize,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:          Arc::clone(&self.store),
      trees:          Arc::clone(&self.trees),
      tree_page_size: self.tree_page_size,
    }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, options: ApiOptions) -> Router<()>
where
  S: FamilyStore + 'static,
{
  let state = ApiState {
    store,
    trees: Arc::new(TreeCache::new(options.tree_cache_ttl)),
    tree_page_size: options.tree_page_size,
  };

  Router::new()
    // Persons
    .route("/persons", get(persons::list::<S>).post(persons::create::<S>))
    .route(
      "/persons/{id}",
      get(persons::get_one::<S>)
        .put(persons::replace::<S>)
        .patch(persons::update::<S>)
        .delete(persons::delete::<S>),
    )
    .route(
      "/persons/{id}/spouses/{spouse_id}",
      post(persons::add_spouse::<S>).delete(persons::remove_spouse::<S>),
    )
    // Clan trees
    .route("/clans/{clan}/tree", get(clans::tree::<S>))
    // Geo-entities
    .route(
      "/chiefdoms",
      get(geo::list_chiefdoms::<S>).post(geo::create_chiefdom::<S>),
    )
    .route(
      "/chiefdoms/{id}",
      get(geo::get_chiefdom::<S>)
        .patch(geo::rename_chiefdom::<S>)
        .delete(geo::delete_chiefdom::<S>),
    )
    .route(
      "/villages",
      get(geo::list_villages::<S>).post(geo::create_village::<S>),
    )
    .route(
      "/villages/{id}",
      get(geo::get_village::<S>)
        .patch(geo::update_village::<S>)
        .delete(geo::delete_village::<S>),
    )
    .route(
      "/locations",
      get(geo::list_locations::<S>).post(geo::create_location::<S>),
    )
    .route(
      "/locations/{id}",
      get(geo::get_location::<S>)
        .patch(geo::rename_location::<S>)
        .delete(geo::delete_location::<S>),
    )
    // Family trees
    .route(
      "/family-trees",
      get(family_trees::list::<S>).post(family_trees::create::<S>),
    )
    .route(
      "/family-trees/{id}",
      get(family_trees::get_one::<S>)
        .patch(family_trees::update::<S>)
        .delete(family_trees::delete::<S>),
    )
    // Users
    .route("/users", get(users::list::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    .with_state(state)
}
