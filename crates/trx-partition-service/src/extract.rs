//! Request extractors.

use axum::extract::FromRequest;

use crate::error::ApiError;

/// JSON body extractor whose rejections render as [`ApiError::BadRequest`].
///
/// Malformed JSON, a missing content type, and unknown or mistyped fields all
/// produce the same `{error:{code,message}}` body as every other 400.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
