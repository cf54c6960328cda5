//! Wishlist bookkeeping. No stock implications; purely per-user rows.

use crate::errors::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

/// A wishlist entry joined with current product display fields.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WishlistEntry {
  pub id: i64,
  pub product_id: i64,
  pub product_name: String,
  pub product_description: String,
  pub price_cents: i64,
  pub image_url: String,
  pub category: String,
  pub stock_quantity: i32,
  pub is_active: bool,
  pub added_at: DateTime<Utc>,
}

pub async fn list_wishlist(pool: &PgPool, user_id: i64) -> Result<Vec<WishlistEntry>> {
  let entries = sqlx::query_as::<_, WishlistEntry>(
    r#"
    SELECT w.id, w.product_id, p.name AS product_name, p.description AS product_description,
           p.price_cents, p.image_url, p.category, p.stock_quantity, p.is_active, w.added_at
    FROM wishlist_items w
    JOIN products p ON p.id = w.product_id
    WHERE w.user_id = $1
    ORDER BY w.added_at ASC
    "#,
  )
  .bind(user_id)
  .fetch_all(pool)
  .await?;
  Ok(entries)
}

/// False if the product does not exist or is already wishlisted.
#[instrument(name = "wishlist_service::add_to_wishlist", skip(pool))]
pub async fn add_to_wishlist(pool: &PgPool, user_id: i64, product_id: i64) -> Result<bool> {
  let product_exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
    .bind(product_id)
    .fetch_one(pool)
    .await?;
  if !product_exists {
    return Ok(false);
  }

  let result = sqlx::query(
    "INSERT INTO wishlist_items (user_id, product_id) VALUES ($1, $2) ON CONFLICT (user_id, product_id) DO NOTHING",
  )
  .bind(user_id)
  .bind(product_id)
  .execute(pool)
  .await?;
  Ok(result.rows_affected() > 0)
}

#[instrument(name = "wishlist_service::remove_from_wishlist", skip(pool))]
pub async fn remove_from_wishlist(pool: &PgPool, user_id: i64, product_id: i64) -> Result<bool> {
  let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}

pub async fn is_in_wishlist(pool: &PgPool, user_id: i64, product_id: i64) -> Result<bool> {
  let exists = sqlx::query_scalar::<_, bool>(
    "SELECT EXISTS (SELECT 1 FROM wishlist_items WHERE user_id = $1 AND product_id = $2)",
  )
  .bind(user_id)
  .bind(product_id)
  .fetch_one(pool)
  .await?;
  Ok(exists)
}

/// False on an already-empty wishlist.
pub async fn clear_wishlist(pool: &PgPool, user_id: i64) -> Result<bool> {
  let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1")
    .bind(user_id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}
