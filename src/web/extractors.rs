use actix_web::{web, FromRequest, HttpRequest};
use tracing::warn;

use crate::errors::AppError;
use crate::services::auth_service;
use crate::state::AppState;

/// The authenticated caller, resolved from the `Authorization: Bearer`
/// header. Handlers take this by value; a missing or invalid token fails
/// the whole request before the handler body runs.
#[derive(Debug)]
pub struct AuthenticatedUser {
  pub user_id: i64,
  pub username: String,
  pub role: String,
}

impl AuthenticatedUser {
  pub fn require_admin(&self) -> Result<(), AppError> {
    if self.role != "Admin" {
      return Err(AppError::Forbidden("Admin role required".to_string()));
    }
    Ok(())
  }
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = futures_util::future::Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    futures_util::future::ready(extract_user(req))
  }
}

fn extract_user(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
  let app_state = req
    .app_data::<web::Data<AppState>>()
    .ok_or_else(|| AppError::Internal("AppState not configured".to_string()))?;

  let header = req
    .headers()
    .get("Authorization")
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| AppError::Auth("Missing Authorization header".to_string()))?;

  let token = header
    .strip_prefix("Bearer ")
    .ok_or_else(|| AppError::Auth("Expected a Bearer token".to_string()))?;

  let claims = auth_service::decode_token(&app_state.config, token).map_err(|e| {
    warn!("Rejected request with invalid token");
    e
  })?;

  Ok(AuthenticatedUser {
    user_id: claims.sub,
    username: claims.username,
    role: claims.role,
  })
}
