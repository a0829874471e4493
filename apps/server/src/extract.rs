//! Extractors whose rejections use the API error shape.
//!
//! axum's own `Json`, `Query` and `Path` reject with plain-text bodies.
//! These wrappers turn every rejection into `400 INVALID_INPUT` with the
//! usual `{ kind, message }` body, so an unknown field in a request body is
//! reported like any other validation failure.

use axum::extract::{FromRequest, FromRequestParts, Path, Query};

use crate::error::ApiError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query string.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// Path parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
