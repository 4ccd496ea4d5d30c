//! HTTP Basic authentication against the accounts in the store.
//!
//! [`require_user`] runs in front of the API router: it checks the
//! `Authorization` header, verifies the password against the stored argon2
//! hash and hands the resulting [`Owner`] to handlers via request extensions.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::{self, SaltString},
};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use kin_api::ApiError;
use kin_core::{store::FamilyStore, user::Owner};
use rand_core::OsRng;

use crate::AppState;

/// Produce the argon2 PHC string stored for a password.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(Argon2::default().hash_password(password.as_bytes(), &salt)?.to_string())
}

/// Username and password from a `Basic` `Authorization` header.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let encoded = headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Basic ")?;
  let decoded = B64.decode(encoded.trim()).ok()?;
  let creds = String::from_utf8(decoded).ok()?;
  let (username, password) = creds.split_once(':')?;
  Some((username.to_owned(), password.to_owned()))
}

/// Resolve credentials to the owning account.
pub async fn authenticate<S: FamilyStore>(
  store: &S,
  username: String,
  password: &str,
) -> Result<Owner, ApiError> {
  let Some(creds) = store
    .user_credentials(username.clone())
    .await
    .map_err(ApiError::store)?
  else {
    tracing::debug!(username = %username, "authentication failed: unknown user");
    return Err(ApiError::Unauthorized);
  };

  let verified = PasswordHash::new(&creds.password_hash).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  });
  if !verified {
    tracing::debug!(username = %username, "authentication failed: bad password");
    return Err(ApiError::Unauthorized);
  }

  Ok(creds.user.owner())
}

/// Middleware rejecting unauthenticated requests with 401.
pub async fn require_user<S: FamilyStore>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Response {
  let Some((username, password)) = basic_credentials(req.headers()) else {
    tracing::debug!("authentication failed: missing or malformed credentials");
    return ApiError::Unauthorized.into_response();
  };

  match authenticate(state.store.as_ref(), username, &password).await {
    Ok(owner) => {
      req.extensions_mut().insert(owner);
      next.run(req).await
    }
    Err(e) => e.into_response(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn headers(value: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    map
  }

  fn basic(user: &str, pass: &str) -> String {
    let encoded = B64.encode(format!("{user}:{pass}"));
    format!("Basic {encoded}")
  }

  #[test]
  fn parses_basic_credentials() {
    let parsed = basic_credentials(&headers(&basic("tendai", "pa:ss")));
    assert_eq!(parsed, Some(("tendai".into(), "pa:ss".into())));
  }

  #[test]
  fn missing_header() {
    assert_eq!(basic_credentials(&HeaderMap::new()), None);
  }

  #[test]
  fn invalid_base64() {
    assert_eq!(basic_credentials(&headers("Basic !!!not-base64!!!")), None);
  }

  #[test]
  fn other_scheme_is_ignored() {
    assert_eq!(basic_credentials(&headers("Bearer abc")), None);
  }

  #[test]
  fn hash_verifies_only_its_password() {
    let hash = hash_password("secret").unwrap();
    let parsed = PasswordHash::new(&hash).unwrap();
    assert!(Argon2::default().verify_password(b"secret", &parsed).is_ok());
    assert!(Argon2::default().verify_password(b"wrong", &parsed).is_err());
  }
}
