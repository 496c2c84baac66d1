use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use inventory_db::DbError;
use serde::Serialize;

/// API error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
  pub error: String,
}

impl ErrorResponse {
  pub fn new(error: impl Into<String>) -> Self {
    Self {
      error: error.into(),
    }
  }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
  /// Store error without a handler-specific message.
  DatabaseError(DbError),
  /// Store failure with the message the client should see.
  Storage {
    context: &'static str,
    source: DbError,
  },
  ValidationError(String),
  Unauthorized(&'static str),
  PayloadTooLarge,
  Internal(String),
}

const BODY_TOO_LARGE: &str = "Request body too large";

impl AppError {
  /// Wrap a store error with a client-facing message.
  ///
  /// Outcomes the client can act on (missing record, taken username) keep
  /// their own status; everything else becomes a 500 carrying `context`.
  pub fn storage(context: &'static str) -> impl FnOnce(DbError) -> AppError {
    move |source| match source {
      DbError::ServerNotFound | DbError::UsernameTaken => AppError::DatabaseError(source),
      source => AppError::Storage { context, source },
    }
  }
}

impl IntoResponse for AppError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      AppError::DatabaseError(db_err) => match db_err {
        DbError::ServerNotFound => (StatusCode::NOT_FOUND, "Server not found".to_string()),
        DbError::UsernameTaken => (StatusCode::CONFLICT, "Username already exists".to_string()),
        DbError::Sqlite(_) | DbError::Connection(_) => {
          // Don't expose internal database errors
          tracing::error!(?db_err, "Internal database error");
          (
            StatusCode::INTERNAL_SERVER_ERROR,
            "An internal error occurred. Please try again later.".to_string(),
          )
        }
      },
      AppError::Storage { context, source } => {
        tracing::error!(?source, "{context}");
        (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
      }
      AppError::ValidationError(msg) => {
        tracing::warn!(validation_error = %msg, "Validation failed");
        (StatusCode::BAD_REQUEST, msg)
      }
      AppError::Unauthorized(msg) => {
        tracing::debug!(reason = msg, "Rejected unauthenticated request");
        (StatusCode::UNAUTHORIZED, msg.to_string())
      }
      AppError::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, BODY_TOO_LARGE.to_string()),
      AppError::Internal(detail) => {
        tracing::error!(%detail, "Internal error");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "An internal error occurred. Please try again later.".to_string(),
        )
      }
    };

    (status, Json(ErrorResponse::new(message))).into_response()
  }
}

impl From<DbError> for AppError {
  fn from(err: DbError) -> Self {
    AppError::DatabaseError(err)
  }
}

impl From<crate::validation::ValidationError> for AppError {
  fn from(err: crate::validation::ValidationError) -> Self {
    AppError::ValidationError(err.to_string())
  }
}

impl From<JsonRejection> for AppError {
  fn from(rejection: JsonRejection) -> Self {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
      return AppError::PayloadTooLarge;
    }
    AppError::ValidationError(rejection.body_text())
  }
}

/// Rewrites the plain-text rejections of the body limit, rate limit and
/// timeout layers into the `{"error": ...}` envelope, keeping their headers.
pub async fn envelope_layer_rejections(response: Response) -> Response {
  let message = match response.status() {
    StatusCode::PAYLOAD_TOO_LARGE => BODY_TOO_LARGE,
    StatusCode::TOO_MANY_REQUESTS => "Too many requests, please try again later",
    StatusCode::REQUEST_TIMEOUT => "Request timed out",
    _ => return response,
  };

  let is_json = response
    .headers()
    .get(header::CONTENT_TYPE)
    .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
  if is_json {
    return response;
  }

  let (parts, _) = response.into_parts();
  let mut enveloped = (parts.status, Json(ErrorResponse::new(message))).into_response();
  for (name, value) in &parts.headers {
    if *name != header::CONTENT_TYPE && *name != header::CONTENT_LENGTH {
      enveloped.headers_mut().append(name.clone(), value.clone());
    }
  }
  enveloped
}
