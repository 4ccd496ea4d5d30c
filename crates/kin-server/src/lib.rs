//! HTTP server for Kin.
//!
//! Mounts the [`kin_api`] router under `/api` behind HTTP Basic auth and
//! request tracing, backed by any [`FamilyStore`].

pub mod auth;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{Router, middleware};
use kin_api::ApiOptions;
use kin_core::store::FamilyStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `KIN_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  /// Roots per page of a clan tree.
  #[serde(default = "default_tree_page_size")]
  pub tree_page_size:      usize,
  /// Seconds a rendered tree page stays cached; `0` disables the cache.
  #[serde(default = "default_tree_cache_ttl_secs")]
  pub tree_cache_ttl_secs: u64,
}

fn default_tree_page_size() -> usize { 10 }

fn default_tree_cache_ttl_secs() -> u64 { 900 }

impl ServerConfig {
  pub fn api_options(&self) -> ApiOptions {
    ApiOptions {
      tree_page_size: self.tree_page_size,
      tree_cache_ttl: Duration::from_secs(self.tree_cache_ttl_secs),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state for the server-level middleware.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: Arc::clone(&self.config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: FamilyStore + 'static,
{
  let api = kin_api::api_router(Arc::clone(&state.store), state.config.api_options())
    .layer(middleware::from_fn_with_state(state, auth::require_user::<S>));

  Router::new()
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use argon2::{
    Algorithm, Argon2, Params, PasswordHasher, Version, password_hash::SaltString,
  };
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use base64::Engine as _;
  use base64::engine::general_purpose::STANDARD as B64;
  use kin_core::user::NewUser;
  use kin_store_sqlite::SqliteStore;
  use rand_core::OsRng;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  /// A low-cost argon2 hash; verification reads the parameters back from it.
  fn cheap_hash(password: &str) -> String {
    let params = Params::new(256, 1, 1, None).unwrap();
    let salt = SaltString::generate(&mut OsRng);
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  async fn make_state() -> AppState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    for user in ["user", "other"] {
      store.create_user(NewUser::new(user, cheap_hash("secret"))).await.unwrap();
    }

    AppState {
      store:  Arc::new(store),
      config: Arc::new(ServerConfig {
        host:                "127.0.0.1".to_string(),
        port:                8000,
        store_path:          PathBuf::from(":memory:"),
        tree_page_size:      10,
        tree_cache_ttl_secs: 0,
      }),
    }
  }

  fn auth_header(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  async fn send_as(
    state:  &AppState<SqliteStore>,
    user:   &str,
    method: &str,
    uri:    &str,
    body:   Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::AUTHORIZATION, auth_header(user, "secret"));
    let body = match body {
      Some(json) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(json.to_string())
      }
      None => Body::empty(),
    };
    let resp = router(state.clone())
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();

    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn send(
    state:  &AppState<SqliteStore>,
    method: &str,
    uri:    &str,
    body:   Option<Value>,
  ) -> (StatusCode, Value) {
    send_as(state, "user", method, uri, body).await
  }

  // ── Auth ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn missing_credentials_are_challenged() {
    let state = make_state().await;
    let req = Request::builder()
      .uri("/api/persons")
      .body(Body::empty())
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
      resp.headers()[header::WWW_AUTHENTICATE],
      kin_api::error::CHALLENGE
    );
  }

  #[tokio::test]
  async fn wrong_password_is_rejected() {
    let state = make_state().await;
    let req = Request::builder()
      .uri("/api/persons")
      .header(header::AUTHORIZATION, auth_header("user", "wrong"))
      .body(Body::empty())
      .unwrap();
    let resp = router(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Clan tree ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn clan_tree_end_to_end() {
    let state = make_state().await;

    let (status, chivero) =
      send(&state, "POST", "/api/chiefdoms", Some(json!({ "name": "Chivero" }))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, village) = send(
      &state,
      "POST",
      "/api/villages",
      Some(json!({ "name": "Gumboreshumba", "chiefdom": "chivero" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(village["chiefdom"], chivero);

    let (status, again) = send(
      &state,
      "POST",
      "/api/villages",
      Some(json!({ "name": "GUMBORESHUMBA", "chiefdom": "Chivero" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, village);

    let (_, jane) = send(
      &state,
      "POST",
      "/api/persons",
      Some(json!({ "first_name": "Jane", "last_name": "Dube", "gender": "F" })),
    )
    .await;
    let (status, john) = send(
      &state,
      "POST",
      "/api/persons",
      Some(json!({
        "first_name": "John",
        "last_name": "Zvihwati",
        "gender": "male",
        "chiefdom_of_origin": "Chivero",
        "village_of_origin": { "name": "gumboreshumba" },
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(john["village_of_origin"], village);
    assert_eq!(john["gender"], "M");

    let (status, alice) = send(
      &state,
      "POST",
      "/api/persons",
      Some(json!({
        "first_name": "Alice",
        "last_name": "Zvihwati",
        "mother": jane["id"],
        "father": john["id"],
      })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, page) = send(&state, "GET", "/api/clans/zvihwati/tree", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);
    assert_eq!(page["next"], Value::Null);
    let root = &page["results"][0];
    assert_eq!(root["id"], john["id"]);
    assert_eq!(root["children"].as_array().unwrap().len(), 1);
    assert_eq!(root["children"][0]["id"], alice["id"]);
    assert_eq!(root["children"][0]["children"], json!([]));

    let (_, chiefdoms) = send(&state, "GET", "/api/chiefdoms", None).await;
    assert_eq!(chiefdoms.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn unknown_clan_is_404() {
    let state = make_state().await;
    let (status, body) = send(&state, "GET", "/api/clans/nobody/tree", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Clan not found." }));
  }

  #[tokio::test]
  async fn page_past_the_end_is_404() {
    let state = make_state().await;
    send(
      &state,
      "POST",
      "/api/persons",
      Some(json!({ "first_name": "John", "last_name": "Moyo" })),
    )
    .await;
    let (status, _) = send(&state, "GET", "/api/clans/Moyo/tree?page=2", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Validation ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn self_parent_names_the_field() {
    let state = make_state().await;
    let (_, p) = send(
      &state,
      "POST",
      "/api/persons",
      Some(json!({ "first_name": "Tariro", "last_name": "Moyo" })),
    )
    .await;

    let uri = format!("/api/persons/{}", p["id"]);
    let (status, body) = send(&state, "PATCH", &uri, Some(json!({ "mother": p["id"] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["mother"][0]["code"], "self_parent");

    let (_, unchanged) = send(&state, "GET", &uri, None).await;
    assert_eq!(unchanged["mother"], Value::Null);
  }

  #[tokio::test]
  async fn village_without_chiefdom_is_rejected() {
    let state = make_state().await;
    let (status, body) = send(
      &state,
      "POST",
      "/api/persons",
      Some(json!({
        "first_name": "Tariro",
        "last_name": "Moyo",
        "village_of_origin": { "name": "Zvihwati" },
      })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["chiefdom_of_origin"][0]["code"], "missing_chiefdom");

    let (_, villages) = send(&state, "GET", "/api/villages", None).await;
    assert_eq!(villages, json!([]));
  }

  #[tokio::test]
  async fn unparseable_body_is_a_field_error() {
    let state = make_state().await;
    let (status, body) = send(
      &state,
      "POST",
      "/api/persons",
      Some(json!({ "first_name": "Tariro", "last_name": "Moyo", "gender": "X" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["non_field_errors"][0]["code"], "invalid");

    let (_, people) = send(&state, "GET", "/api/persons", None).await;
    assert_eq!(people, json!([]));
  }

  #[tokio::test]
  async fn put_replaces_the_whole_record() {
    let state = make_state().await;
    let (_, mother) = send(
      &state,
      "POST",
      "/api/persons",
      Some(json!({ "first_name": "Rudo", "last_name": "Moyo" })),
    )
    .await;
    let (_, p) = send(
      &state,
      "POST",
      "/api/persons",
      Some(json!({
        "first_name": "Tariro",
        "last_name": "Moyo",
        "mother": mother["id"],
        "current_location": "Harare",
      })),
    )
    .await;

    let uri = format!("/api/persons/{}", p["id"]);
    let (status, replaced) = send(
      &state,
      "PUT",
      &uri,
      Some(json!({ "first_name": "Tariro", "last_name": "Chari" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["last_name"], "Chari");
    assert_eq!(replaced["mother"], Value::Null);
    assert_eq!(replaced["current_location"], Value::Null);
  }

  // ── Ownership ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn people_are_private_to_their_owner() {
    let state = make_state().await;
    let (_, p) = send(
      &state,
      "POST",
      "/api/persons",
      Some(json!({ "first_name": "Tariro", "last_name": "Moyo", "user": 99 })),
    )
    .await;
    let (_, me) = send(&state, "GET", "/api/users", None).await;
    assert_eq!(p["user"], me[0]["id"]);
    assert_eq!(me[0]["email"], "");

    let uri = format!("/api/persons/{}", p["id"]);
    let (status, _) = send_as(&state, "other", "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send_as(&state, "other", "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&state, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
  }

  // ── Geo ─────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn geo_rename_conflict_is_409() {
    let state = make_state().await;
    send(&state, "POST", "/api/locations", Some(json!({ "name": "Harare" }))).await;
    let (_, byo) =
      send(&state, "POST", "/api/locations", Some(json!({ "name": "Bulawayo" }))).await;

    let uri = format!("/api/locations/{}", byo["id"]);
    let (status, _) = send(&state, "PATCH", &uri, Some(json!({ "name": "harare" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, found) = send(&state, "GET", "/api/locations?search=BULA", None).await;
    assert_eq!(found, json!([byo]));
  }

  // ── Family trees ────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn family_tree_returns_member_records() {
    let state = make_state().await;
    let (_, p) = send(
      &state,
      "POST",
      "/api/persons",
      Some(json!({ "first_name": "Tariro", "last_name": "Moyo" })),
    )
    .await;

    let (status, tree) = send(
      &state,
      "POST",
      "/api/family-trees",
      Some(json!({ "name": "Moyo family", "members": [p["id"]] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tree["members"][0]["first_name"], "Tariro");

    let uri = format!("/api/family-trees/{}", tree["id"]);
    let (status, _) = send_as(&state, "other", "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }
}
