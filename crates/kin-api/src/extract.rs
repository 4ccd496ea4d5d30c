//! Request body extraction.

use axum::extract::FromRequest;

use crate::error::ApiError;

/// [`axum::Json`] with its rejections turned into [`ApiError`], so a body that
/// fails to parse gets the same `{"errors": ...}` response as a failed check.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
