//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use yourdiet_core::merge::MergeError;

use crate::token::TokenError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{field}: {message}")]
  Validation { field: String, message: String },

  #[error("unauthenticated: {0}")]
  Unauthenticated(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// A server-side failure that is not the caller's fault (hashing, signing).
  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Validation { field: field.into(), message: message.into() }
  }

  pub fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(e))
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::Validation { field, message } => {
        tracing::warn!(%field, %message, "rejected invalid request");
        (StatusCode::BAD_REQUEST, Json(json!({ "field": field, "message": message })))
          .into_response()
      }
      ApiError::Unauthenticated(m) => {
        tracing::warn!(reason = %m, "rejected unauthenticated request");
        let mut res =
          (StatusCode::UNAUTHORIZED, Json(json!({ "error": m }))).into_response();
        res
          .headers_mut()
          .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        res
      }
      ApiError::Forbidden(m) => {
        tracing::warn!(reason = %m, "rejected forbidden request");
        (StatusCode::FORBIDDEN, Json(json!({ "error": m }))).into_response()
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response(),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, Json(json!({ "error": m }))).into_response(),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        internal()
      }
      ApiError::Internal(m) => {
        tracing::error!(error = %m, "internal failure");
        internal()
      }
    }
  }
}

fn internal() -> Response {
  (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "internal error" }))).into_response()
}

// ─── Conversions ─────────────────────────────────────────────────────────────

impl From<yourdiet_core::Error> for ApiError {
  fn from(e: yourdiet_core::Error) -> Self {
    match e {
      yourdiet_core::Error::Validation { field, message } => Self::Validation { field, message },
      other => Self::Internal(other.to_string()),
    }
  }
}

impl From<MergeError> for ApiError {
  fn from(e: MergeError) -> Self {
    match e {
      MergeError::NotOwner { .. } => {
        Self::Forbidden("you do not have permission to update this diet".into())
      }
      MergeError::VersionMismatch { .. } => Self::Conflict(e.to_string()),
    }
  }
}

impl From<TokenError> for ApiError {
  fn from(e: TokenError) -> Self {
    match e {
      TokenError::Invalid(_) => Self::Unauthenticated(e.to_string()),
      TokenError::Signing(_) => Self::Internal(e.to_string()),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(e: JsonRejection) -> Self { Self::validation("body", e.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(e: QueryRejection) -> Self { Self::validation("query", e.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(e: PathRejection) -> Self { Self::validation("id", e.body_text()) }
}
