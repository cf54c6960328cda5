use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::services::auth_service::{self, RegisterRequest, UpdateProfileRequest};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RestrictPayload {
  pub restricted: bool,
}

#[instrument(name = "handler::register", skip(app_state, payload), fields(username = %payload.username))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
  let user = auth_service::register(&app_state.db_pool, &payload).await?;
  Ok(HttpResponse::Created().json(json!({
    "message": "Registration successful",
    "user": user
  })))
}

#[instrument(name = "handler::login", skip(app_state, payload), fields(username = %payload.username))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
  let outcome = auth_service::login(&app_state.db_pool, &app_state.config, &payload.username, &payload.password).await?;
  Ok(HttpResponse::Ok().json(outcome))
}

pub async fn profile_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let user = auth_service::get_profile(&app_state.db_pool, &auth_user.username).await?;
  Ok(HttpResponse::Ok().json(user))
}

#[instrument(name = "handler::update_profile", skip(app_state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
  let user = auth_service::update_profile(&app_state.db_pool, auth_user.user_id, &payload).await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Profile updated",
    "user": user
  })))
}

// Tokens are stateless, so logout is a client-side discard; the endpoint
// exists so clients have a uniform call to make.
pub async fn logout_handler(_auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(json!({"message": "Logout successful"})))
}

pub async fn list_users_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let users = auth_service::list_users(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(users))
}

#[instrument(name = "handler::approve_user", skip(app_state, auth_user), fields(target = %path.as_ref()))]
pub async fn approve_user_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  if !auth_service::approve_user(&app_state.db_pool, *path).await? {
    return Err(AppError::NotFound("User not found".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({"message": "User approved"})))
}

#[instrument(
  name = "handler::restrict_user",
  skip(app_state, auth_user, payload),
  fields(target = %path.as_ref(), restricted = %payload.restricted)
)]
pub async fn restrict_user_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  payload: web::Json<RestrictPayload>,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  if !auth_service::restrict_user(&app_state.db_pool, *path, payload.restricted).await? {
    return Err(AppError::NotFound("User not found".to_string()));
  }
  Ok(HttpResponse::Ok().json(json!({"message": "User restriction updated"})))
}
