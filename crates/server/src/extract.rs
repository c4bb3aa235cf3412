//! Extractors whose rejections use the `{"error": ...}` body.

use axum::extract::{FromRequest, FromRequestParts};

use crate::ServerError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ServerError))]
pub struct ApiPath<T>(pub T);
