use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("{0} is no longer available")]
  Unavailable(String),

  #[error("Insufficient stock for {0}")]
  InsufficientStock(String),

  #[error("No items to checkout")]
  NothingToCheckout,

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Allow anyhow::Error to be converted into AppError::Internal for convenience
// in code that calls `?` on functions returning anyhow::Result.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    if err.is::<sqlx::Error>() {
      return AppError::Sqlx(err.downcast::<sqlx::Error>().unwrap());
    }
    AppError::Internal(err.to_string())
  }
}

impl AppError {
  /// True for storage aborts that left no partial effect and are safe to
  /// retry once: Postgres serialization failures (40001) and deadlocks
  /// (40P01), which `SELECT ... FOR UPDATE` checkouts can hit under load.
  pub fn is_transient_conflict(&self) -> bool {
    match self {
      AppError::Sqlx(sqlx::Error::Database(db_err)) => {
        matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
      }
      _ => false,
    }
  }
}

/// True when a storage error is a Postgres unique-constraint violation
/// (SQLSTATE 23505), e.g. two concurrent registrations of one username.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
  matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"message": m})),
      AppError::Auth(m) => HttpResponse::Unauthorized().json(json!({"message": m})),
      AppError::Forbidden(m) => HttpResponse::Forbidden().json(json!({"message": m})),
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"message": m})),
      AppError::Unavailable(_) | AppError::InsufficientStock(_) | AppError::NothingToCheckout => {
        HttpResponse::BadRequest().json(json!({"message": self.to_string()}))
      }
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"message": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"message": "Database operation failed"})),
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"message": "An internal error occurred", "detail": m}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::http::StatusCode;

  #[test]
  fn stock_errors_map_to_bad_request() {
    let err = AppError::InsufficientStock("Mechanical Keyboard".to_string());
    assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.to_string(), "Insufficient stock for Mechanical Keyboard");

    let err = AppError::Unavailable("Desk Lamp".to_string());
    assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.to_string(), "Desk Lamp is no longer available");
  }

  #[test]
  fn taxonomy_maps_to_expected_statuses() {
    let cases = [
      (AppError::Validation("q".into()), StatusCode::BAD_REQUEST),
      (AppError::Auth("no token".into()), StatusCode::UNAUTHORIZED),
      (AppError::Forbidden("admins only".into()), StatusCode::FORBIDDEN),
      (AppError::NotFound("Product not found".into()), StatusCode::NOT_FOUND),
      (AppError::NothingToCheckout, StatusCode::BAD_REQUEST),
      (AppError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, status) in cases {
      assert_eq!(err.error_response().status(), status, "for {err}");
    }
  }

  #[test]
  fn non_database_errors_are_not_transient() {
    assert!(!AppError::NothingToCheckout.is_transient_conflict());
    assert!(!AppError::Sqlx(sqlx::Error::RowNotFound).is_transient_conflict());
  }
}
