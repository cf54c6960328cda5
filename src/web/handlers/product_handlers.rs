use actix_web::{web, HttpResponse};
use tracing::instrument;

use crate::errors::AppError;
use crate::services::product_service::{self, ProductInput};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = product_service::list_products(&app_state.db_pool).await?;
  Ok(HttpResponse::Ok().json(products))
}

pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let product = product_service::get_product(&app_state.db_pool, *path).await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::create_product", skip(app_state, auth_user, payload), fields(sku = %payload.sku))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<ProductInput>,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let product = product_service::create_product(&app_state.db_pool, &payload).await?;
  Ok(HttpResponse::Created().json(product))
}

#[instrument(name = "handler::update_product", skip(app_state, auth_user, payload), fields(product_id = %path.as_ref()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  payload: web::Json<ProductInput>,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  let product = product_service::update_product(&app_state.db_pool, *path, &payload).await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::delete_product", skip(app_state, auth_user), fields(product_id = %path.as_ref()))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  auth_user.require_admin()?;
  if !product_service::delete_product(&app_state.db_pool, *path).await? {
    return Err(AppError::NotFound("Product not found".to_string()));
  }
  Ok(HttpResponse::NoContent().finish())
}
