//! Extractors whose rejections render as [`ApiError`] JSON bodies.
//!
//! Handlers use these in place of the axum originals so malformed bodies,
//! query strings and path segments answer `400 {"error": ..}` like every
//! other failure.

use axum::{
  extract::{FromRequest, FromRequestParts},
  response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::ApiError;

/// JSON body extractor and response.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
  fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);
