//! The authenticated-owner extractor.
//!
//! Credential checking is the embedding server's job: it verifies the request
//! and inserts an [`Owner`] into the request extensions. Handlers only see the
//! result.

use axum::{extract::FromRequestParts, http::request::Parts};
use kin_core::user::Owner;

use crate::error::ApiError;

/// Present in a handler means the request was authenticated as this owner.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Owner);

impl<S> FromRequestParts<S> for Authenticated
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Owner>()
      .copied()
      .map(Authenticated)
      .ok_or(ApiError::Unauthorized)
  }
}
