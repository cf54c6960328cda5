use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::services::cart_service::{self, CheckoutSelection};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
pub struct AddToCartQuery {
  #[serde(default = "default_quantity")]
  pub quantity: i32,
}

fn default_quantity() -> i32 {
  1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
  #[serde(default)]
  pub product_ids: Option<Vec<i64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSelectedPayload {
  pub product_ids: Vec<i64>,
}

#[instrument(name = "handler::get_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn get_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let lines = cart_service::list_cart(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::Ok().json(lines))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, auth_user, query),
  fields(user_id = %auth_user.user_id, product_id = %path.as_ref(), quantity = %query.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
  query: web::Query<AddToCartQuery>,
) -> Result<HttpResponse, AppError> {
  let line = cart_service::add_to_cart(&app_state.db_pool, auth_user.user_id, *path, query.quantity).await?;
  Ok(HttpResponse::Ok().json(line))
}

#[instrument(
  name = "handler::increase_quantity",
  skip(app_state, auth_user),
  fields(user_id = %auth_user.user_id, product_id = %path.as_ref())
)]
pub async fn increase_quantity_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let line = cart_service::increase_quantity(&app_state.db_pool, auth_user.user_id, *path).await?;
  Ok(HttpResponse::Ok().json(line))
}

#[instrument(
  name = "handler::decrease_quantity",
  skip(app_state, auth_user),
  fields(user_id = %auth_user.user_id, product_id = %path.as_ref())
)]
pub async fn decrease_quantity_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  match cart_service::decrease_quantity(&app_state.db_pool, auth_user.user_id, *path).await? {
    Some(line) => Ok(HttpResponse::Ok().json(line)),
    // The line reached quantity zero and was removed.
    None => Ok(HttpResponse::NoContent().finish()),
  }
}

#[instrument(
  name = "handler::remove_from_cart",
  skip(app_state, auth_user),
  fields(user_id = %auth_user.user_id, product_id = %path.as_ref())
)]
pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let removed = cart_service::remove_from_cart(&app_state.db_pool, auth_user.user_id, *path).await?;
  if !removed {
    return Ok(HttpResponse::NotFound().json(json!({"message": "Cart item not found"})));
  }
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::clear_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn clear_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  cart_service::clear_cart(&app_state.db_pool, auth_user.user_id).await?;
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::checkout", skip(app_state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: Option<web::Json<CheckoutPayload>>,
) -> Result<HttpResponse, AppError> {
  let selection = CheckoutSelection::from_filter(payload.and_then(|p| p.into_inner().product_ids));
  run_checkout(app_state.get_ref(), auth_user.user_id, selection).await
}

#[instrument(
  name = "handler::checkout_selected",
  skip(app_state, auth_user, payload),
  fields(user_id = %auth_user.user_id)
)]
pub async fn checkout_selected_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<CheckoutSelectedPayload>,
) -> Result<HttpResponse, AppError> {
  let selection = CheckoutSelection::from_required(payload.into_inner().product_ids)?;
  run_checkout(app_state.get_ref(), auth_user.user_id, selection).await
}

/// Shared by both checkout entry points. A serialization/deadlock abort is
/// retried exactly once: checkout's validate-then-commit design leaves no
/// partial effect on abort.
async fn run_checkout(app_state: &AppState, user_id: i64, selection: CheckoutSelection) -> Result<HttpResponse, AppError> {
  if let Err(err) = cart_service::checkout(&app_state.db_pool, user_id, &selection).await {
    if !err.is_transient_conflict() {
      return Err(err);
    }
    warn!(user_id, error = %err, "checkout hit a transient storage conflict, retrying once");
    cart_service::checkout(&app_state.db_pool, user_id, &selection).await?;
  }
  info!(user_id, "checkout successful");
  Ok(HttpResponse::Ok().json(json!({"message": "Checkout successful"})))
}
