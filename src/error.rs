//! Error taxonomy for the HTTP surface.
//!
//! Validation problems are reported in place (400), failing integrations as
//! 502/503, anything else as a generic 500. Nothing here is fatal to the process.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::pdf::ExportError;
use crate::quiz::QuizError;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  Validation(String),

  #[error("{service} request failed: {message}")]
  Upstream { service: &'static str, message: String },

  #[error("{0} is not configured on this server")]
  Unavailable(&'static str),

  #[error("unexpected error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn validation(msg: impl Into<String>) -> Self {
    ApiError::Validation(msg.into())
  }

  pub fn upstream(service: &'static str, message: impl Into<String>) -> Self {
    ApiError::Upstream { service, message: message.into() }
  }

  fn kind(&self) -> &'static str {
    match self {
      ApiError::Validation(_) => "validation",
      ApiError::Upstream { .. } => "upstream",
      ApiError::Unavailable(_) => "unavailable",
      ApiError::Internal(_) => "internal",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::Upstream { .. } => StatusCode::BAD_GATEWAY,
      ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<QuizError> for ApiError {
  fn from(e: QuizError) -> Self {
    ApiError::Validation(e.to_string())
  }
}

impl From<ExportError> for ApiError {
  fn from(e: ExportError) -> Self {
    ApiError::Internal(e.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!(target: "pedibrief_backend", kind = self.kind(), error = %self, "Request failed");
    }
    // Internal details stay in the log.
    let message = match &self {
      ApiError::Internal(_) => "Something went wrong. Please try again.".to_string(),
      other => other.to_string(),
    };
    (status, Json(json!({ "error": self.kind(), "message": message }))).into_response()
  }
}
