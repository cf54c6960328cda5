use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;

use crate::errors::AppError;
use crate::services::wishlist_service;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

pub async fn get_wishlist_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let entries = wishlist_service::list_wishlist(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(entries))
}

#[instrument(
  name = "handler::add_to_wishlist",
  skip(app_state, auth_user),
  fields(user_id = %auth_user.user_id, product_id = %path.as_ref())
)]
pub async fn add_to_wishlist_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let added = wishlist_service::add_to_wishlist(&app_state.db_pool, auth_user.user_id, *path).await?;
  if !added {
    return Ok(HttpResponse::BadRequest().json(json!({"message": "Product missing or already in wishlist"})));
  }
  Ok(HttpResponse::Created().json(json!({"message": "Added to wishlist"})))
}

#[instrument(
  name = "handler::remove_from_wishlist",
  skip(app_state, auth_user),
  fields(user_id = %auth_user.user_id, product_id = %path.as_ref())
)]
pub async fn remove_from_wishlist_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let removed = wishlist_service::remove_from_wishlist(&app_state.db_pool, auth_user.user_id, *path).await?;
  if !removed {
    return Ok(HttpResponse::NotFound().json(json!({"message": "Wishlist item not found"})));
  }
  Ok(HttpResponse::NoContent().finish())
}

pub async fn contains_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let contains = wishlist_service::is_in_wishlist(&app_state.db_pool, auth_user.user_id, *path).await?;
  Ok(HttpResponse::Ok().json(json!({"inWishlist": contains})))
}

pub async fn clear_wishlist_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  wishlist_service::clear_wishlist(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::NoContent().finish())
}
