//! Product catalog CRUD. The cart engine only ever reads products and
//! conditionally decrements stock; everything that creates or edits a
//! product lives here.

use crate::errors::{AppError, Result};
use crate::models::Product;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
pub struct ProductInput {
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub price_cents: i64,
  pub stock_quantity: i32,
  pub sku: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub image_url: String,
  #[serde(default = "default_true")]
  pub is_active: bool,
}

fn default_true() -> bool {
  true
}

fn validate_input(input: &ProductInput) -> Result<()> {
  if input.name.trim().is_empty() || input.sku.trim().is_empty() {
    return Err(AppError::Validation("Name and SKU are required".to_string()));
  }
  if input.price_cents < 0 {
    return Err(AppError::Validation("Price cannot be negative".to_string()));
  }
  if input.stock_quantity < 0 {
    return Err(AppError::Validation("Stock quantity cannot be negative".to_string()));
  }
  Ok(())
}

pub async fn list_products(pool: &PgPool) -> Result<Vec<Product>> {
  let products = sqlx::query_as::<_, Product>("SELECT * FROM products ORDER BY created_at DESC")
    .fetch_all(pool)
    .await?;
  Ok(products)
}

pub async fn get_product(pool: &PgPool, product_id: i64) -> Result<Product> {
  sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
    .bind(product_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

#[instrument(name = "product_service::create_product", skip(pool, input), fields(sku = %input.sku))]
pub async fn create_product(pool: &PgPool, input: &ProductInput) -> Result<Product> {
  validate_input(input)?;
  if sku_exists(pool, &input.sku, None).await? {
    return Err(AppError::Validation(format!(
      "A product with SKU '{}' already exists",
      input.sku
    )));
  }

  let product = sqlx::query_as::<_, Product>(
    r#"
    INSERT INTO products (name, description, price_cents, stock_quantity, sku, category, image_url, is_active)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    RETURNING *
    "#,
  )
  .bind(&input.name)
  .bind(&input.description)
  .bind(input.price_cents)
  .bind(input.stock_quantity)
  .bind(&input.sku)
  .bind(&input.category)
  .bind(&input.image_url)
  .bind(input.is_active)
  .fetch_one(pool)
  .await?;

  info!(product_id = product.id, "product created");
  Ok(product)
}

#[instrument(name = "product_service::update_product", skip(pool, input))]
pub async fn update_product(pool: &PgPool, product_id: i64, input: &ProductInput) -> Result<Product> {
  validate_input(input)?;
  if sku_exists(pool, &input.sku, Some(product_id)).await? {
    return Err(AppError::Validation(format!(
      "A product with SKU '{}' already exists",
      input.sku
    )));
  }

  sqlx::query_as::<_, Product>(
    r#"
    UPDATE products
    SET name = $2, description = $3, price_cents = $4, stock_quantity = $5,
        sku = $6, category = $7, image_url = $8, is_active = $9
    WHERE id = $1
    RETURNING *
    "#,
  )
  .bind(product_id)
  .bind(&input.name)
  .bind(&input.description)
  .bind(input.price_cents)
  .bind(input.stock_quantity)
  .bind(&input.sku)
  .bind(&input.category)
  .bind(&input.image_url)
  .bind(input.is_active)
  .fetch_optional(pool)
  .await?
  .ok_or_else(|| AppError::NotFound("Product not found".to_string()))
}

#[instrument(name = "product_service::delete_product", skip(pool))]
pub async fn delete_product(pool: &PgPool, product_id: i64) -> Result<bool> {
  let result = sqlx::query("DELETE FROM products WHERE id = $1")
    .bind(product_id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}

async fn sku_exists(pool: &PgPool, sku: &str, exclude_id: Option<i64>) -> Result<bool> {
  let exists = match exclude_id {
    Some(id) => {
      sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE sku = $1 AND id <> $2)")
        .bind(sku)
        .bind(id)
        .fetch_one(pool)
        .await?
    }
    None => {
      sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE sku = $1)")
        .bind(sku)
        .fetch_one(pool)
        .await?
    }
  };
  Ok(exists)
}
