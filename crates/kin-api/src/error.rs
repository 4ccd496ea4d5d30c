//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use kin_core::{
  DomainError,
  validate::{Violation, ViolationKind},
};
use serde_json::json;
use thiserror::Error;

/// `WWW-Authenticate` challenge sent with every 401.
pub const CHALLENGE: &str = "Basic realm=\"kin\"";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("validation failed: {0}")]
  Validation(Violation),

  #[error("conflict: {0}")]
  Conflict(String),

  /// A body rejected before it reached the handler for a reason other than
  /// its content, such as a missing `Content-Type`.
  #[error("rejected request: {1}")]
  Rejected(StatusCode, String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store (or core) error: domain failures become client errors,
  /// anything else is a storage fault.
  pub fn store<E>(e: E) -> Self
  where
    E: DomainError + std::error::Error + Send + Sync + 'static,
  {
    let classified = match e.as_domain() {
      Some(kin_core::Error::Validation(v)) => Some(ApiError::Validation(v.clone())),
      Some(kin_core::Error::ClanNotFound(_)) => {
        Some(ApiError::NotFound("Clan not found.".into()))
      }
      Some(d) if d.is_not_found() => Some(ApiError::NotFound(d.to_string())),
      Some(
        d @ (kin_core::Error::UsernameTaken(_) | kin_core::Error::GeoNameTaken { .. }),
      ) => Some(ApiError::Conflict(d.to_string())),
      _ => None,
    };
    classified.unwrap_or_else(|| ApiError::Store(Box::new(e)))
  }
}

/// Bodies that fail to parse are reported like any other field error, under
/// `non_field_errors`.
impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    match &rejection {
      JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
        ApiError::Validation(Violation::new(
          "non_field_errors",
          ViolationKind::Invalid,
          rejection.body_text(),
        ))
      }
      _ => ApiError::Rejected(rejection.status(), rejection.body_text()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Unauthorized => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "detail": "Authentication credentials were not provided or are invalid." })),
        )
          .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static(CHALLENGE),
        );
        res
      }
      ApiError::Validation(v) => {
        let body = json!({
          "errors": { (v.field): [{ "code": v.kind, "message": v.message }] }
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, Json(json!({ "detail": m }))).into_response(),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, Json(json!({ "detail": m }))).into_response(),
      ApiError::Rejected(status, m) => (status, Json(json!({ "detail": m }))).into_response(),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": e.to_string() })))
          .into_response()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use kin_core::geo::GeoKind;

  #[test]
  fn domain_errors_are_classified() {
    let v = Violation::new("mother", ViolationKind::SelfParent, "x");
    assert!(matches!(
      ApiError::store(kin_core::Error::Validation(v)),
      ApiError::Validation(_)
    ));
    assert!(matches!(
      ApiError::store(kin_core::Error::PersonNotFound(1)),
      ApiError::NotFound(_)
    ));
    assert!(matches!(
      ApiError::store(kin_core::Error::GeoNameTaken {
        kind: GeoKind::Location,
        name: "Harare".into(),
      }),
      ApiError::Conflict(_)
    ));
  }

  #[test]
  fn unknown_clan_has_fixed_detail() {
    match ApiError::store(kin_core::Error::ClanNotFound("Moyo".into())) {
      ApiError::NotFound(m) => assert_eq!(m, "Clan not found."),
      other => panic!("unexpected: {other:?}"),
    }
  }

  #[test]
  fn unauthorized_carries_challenge() {
    let res = ApiError::Unauthorized.into_response();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(res.headers()[header::WWW_AUTHENTICATE], CHALLENGE);
  }
}
