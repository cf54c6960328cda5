//! The cart & checkout engine.
//!
//! Every check-then-write runs inside one transaction with the product row
//! locked (`SELECT ... FOR UPDATE`), so concurrent mutations of the same
//! line, and concurrent checkouts racing for the same stock, serialize at
//! the storage layer. Cart quantities are a soft hold: stock is only
//! debited at checkout commit time.

use crate::errors::{AppError, Result};
use crate::models::Product;
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::{info, instrument};

/// A cart line joined with the current product snapshot, as returned to the
/// HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
  pub id: i64,
  pub product_id: i64,
  pub quantity: i32,
  pub is_selected: bool,
  pub product: Product,
}

#[derive(Debug, FromRow)]
struct CartLineRow {
  id: i64,
  quantity: i32,
  is_selected: bool,
  product_id: i64,
  product_name: String,
  product_description: String,
  price_cents: i64,
  stock_quantity: i32,
  sku: String,
  category: String,
  image_url: String,
  is_active: bool,
  product_created_at: chrono::DateTime<chrono::Utc>,
}

impl From<CartLineRow> for CartLine {
  fn from(row: CartLineRow) -> Self {
    CartLine {
      id: row.id,
      product_id: row.product_id,
      quantity: row.quantity,
      is_selected: row.is_selected,
      product: Product {
        id: row.product_id,
        name: row.product_name,
        description: row.product_description,
        price_cents: row.price_cents,
        stock_quantity: row.stock_quantity,
        sku: row.sku,
        category: row.category,
        image_url: row.image_url,
        is_active: row.is_active,
        created_at: row.product_created_at,
      },
    }
  }
}

const CART_LINE_COLUMNS: &str = r#"
  c.id, c.quantity, c.is_selected,
  p.id AS product_id, p.name AS product_name, p.description AS product_description,
  p.price_cents, p.stock_quantity, p.sku, p.category, p.image_url, p.is_active,
  p.created_at AS product_created_at
"#;

/// Row-locks the product so the check-then-write that follows cannot race
/// another mutation or an in-flight checkout on the same product.
async fn lock_product(conn: &mut PgConnection, product_id: i64) -> Result<Option<Product>> {
  let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
  Ok(product)
}

fn validate_quantity(quantity: i32) -> Result<()> {
  if quantity <= 0 {
    return Err(AppError::Validation("Quantity must be greater than 0".to_string()));
  }
  Ok(())
}

/// All of a user's cart lines, oldest first. A line whose product has been
/// deleted from the catalog is simply not emitted (inner join by id).
#[instrument(name = "cart_service::list_cart", skip(pool))]
pub async fn list_cart(pool: &PgPool, user_id: i64) -> Result<Vec<CartLine>> {
  let rows = sqlx::query_as::<_, CartLineRow>(&format!(
    r#"
    SELECT {CART_LINE_COLUMNS}
    FROM cart_items c
    JOIN products p ON p.id = c.product_id
    WHERE c.user_id = $1
    ORDER BY c.created_at ASC
    "#
  ))
  .bind(user_id)
  .fetch_all(pool)
  .await?;

  Ok(rows.into_iter().map(CartLine::from).collect())
}

/// Creates a line for (user, product) or increments an existing one.
///
/// The stock check is against the *resulting* line quantity: an existing
/// line of 3 plus a request for 2 needs stock of at least 5. Stock is not
/// debited here.
#[instrument(name = "cart_service::add_to_cart", skip(pool))]
pub async fn add_to_cart(pool: &PgPool, user_id: i64, product_id: i64, quantity: i32) -> Result<CartLine> {
  validate_quantity(quantity)?;

  let mut tx = pool.begin().await?;

  let product = lock_product(&mut tx, product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

  if !product.is_active {
    return Err(AppError::Unavailable(product.name));
  }

  let existing_quantity = sqlx::query_scalar::<_, i32>(
    "SELECT quantity FROM cart_items WHERE user_id = $1 AND product_id = $2",
  )
  .bind(user_id)
  .bind(product_id)
  .fetch_optional(&mut *tx)
  .await?;

  let requested_total = existing_quantity.unwrap_or(0) + quantity;
  if product.stock_quantity < requested_total {
    return Err(AppError::InsufficientStock(product.name));
  }

  // The product row lock above serializes concurrent adds for the same
  // product, so this upsert cannot lose an update.
  let row = sqlx::query_as::<_, CartLineRow>(&format!(
    r#"
    WITH upserted AS (
      INSERT INTO cart_items (user_id, product_id, quantity)
      VALUES ($1, $2, $3)
      ON CONFLICT (user_id, product_id)
      DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW()
      RETURNING id, quantity, is_selected, product_id
    )
    SELECT {CART_LINE_COLUMNS}
    FROM upserted c
    JOIN products p ON p.id = c.product_id
    "#
  ))
  .bind(user_id)
  .bind(product_id)
  .bind(quantity)
  .fetch_one(&mut *tx)
  .await?;

  tx.commit().await?;

  info!(user_id, product_id, new_quantity = row.quantity, "cart line added/updated");
  Ok(row.into())
}

/// Increments an existing line by exactly 1.
#[instrument(name = "cart_service::increase_quantity", skip(pool))]
pub async fn increase_quantity(pool: &PgPool, user_id: i64, product_id: i64) -> Result<CartLine> {
  let mut tx = pool.begin().await?;

  let product = lock_product(&mut tx, product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

  let line_quantity = sqlx::query_scalar::<_, i32>(
    "SELECT quantity FROM cart_items WHERE user_id = $1 AND product_id = $2 FOR UPDATE",
  )
  .bind(user_id)
  .bind(product_id)
  .fetch_optional(&mut *tx)
  .await?
  .ok_or_else(|| AppError::NotFound("Cart item not found".to_string()))?;

  if !product.is_active {
    return Err(AppError::Unavailable(product.name));
  }
  if product.stock_quantity < line_quantity + 1 {
    return Err(AppError::InsufficientStock(product.name));
  }

  let row = sqlx::query_as::<_, CartLineRow>(&format!(
    r#"
    WITH updated AS (
      UPDATE cart_items SET quantity = quantity + 1, updated_at = NOW()
      WHERE user_id = $1 AND product_id = $2
      RETURNING id, quantity, is_selected, product_id
    )
    SELECT {CART_LINE_COLUMNS}
    FROM updated c
    JOIN products p ON p.id = c.product_id
    "#
  ))
  .bind(user_id)
  .bind(product_id)
  .fetch_optional(&mut *tx)
  .await?
  .ok_or_else(|| AppError::NotFound("Cart item not found".to_string()))?;

  tx.commit().await?;
  Ok(row.into())
}

/// Decrements an existing line by exactly 1. A line at quantity 1 is
/// deleted instead and `None` is returned; quantity 0 is never persisted.
/// Decrease never checks stock, the quantity only shrinks.
#[instrument(name = "cart_service::decrease_quantity", skip(pool))]
pub async fn decrease_quantity(pool: &PgPool, user_id: i64, product_id: i64) -> Result<Option<CartLine>> {
  let mut tx = pool.begin().await?;

  let line_quantity = sqlx::query_scalar::<_, i32>(
    "SELECT quantity FROM cart_items WHERE user_id = $1 AND product_id = $2 FOR UPDATE",
  )
  .bind(user_id)
  .bind(product_id)
  .fetch_optional(&mut *tx)
  .await?
  .ok_or_else(|| AppError::NotFound("Cart item not found".to_string()))?;

  if line_quantity <= 1 {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
      .bind(user_id)
      .bind(product_id)
      .execute(&mut *tx)
      .await?;
    tx.commit().await?;
    info!(user_id, product_id, "cart line removed by decrease");
    return Ok(None);
  }

  let row = sqlx::query_as::<_, CartLineRow>(&format!(
    r#"
    WITH updated AS (
      UPDATE cart_items SET quantity = quantity - 1, updated_at = NOW()
      WHERE user_id = $1 AND product_id = $2
      RETURNING id, quantity, is_selected, product_id
    )
    SELECT {CART_LINE_COLUMNS}
    FROM updated c
    JOIN products p ON p.id = c.product_id
    "#
  ))
  .bind(user_id)
  .bind(product_id)
  .fetch_one(&mut *tx)
  .await?;

  tx.commit().await?;
  Ok(Some(row.into()))
}

/// Idempotent: returns whether a line existed and was deleted.
#[instrument(name = "cart_service::remove_from_cart", skip(pool))]
pub async fn remove_from_cart(pool: &PgPool, user_id: i64, product_id: i64) -> Result<bool> {
  let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
    .bind(user_id)
    .bind(product_id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}

/// Deletes all of the user's lines; false if the cart was already empty.
#[instrument(name = "cart_service::clear_cart", skip(pool))]
pub async fn clear_cart(pool: &PgPool, user_id: i64) -> Result<bool> {
  let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
    .bind(user_id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}

/// Which cart lines a checkout targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutSelection {
  /// Every line in the user's cart.
  All,
  /// Only lines whose product id is in the set.
  Subset(Vec<i64>),
}

impl CheckoutSelection {
  /// Full checkout: an absent or empty filter means "all lines".
  pub fn from_filter(product_ids: Option<Vec<i64>>) -> Self {
    match product_ids {
      Some(ids) if !ids.is_empty() => CheckoutSelection::Subset(ids),
      _ => CheckoutSelection::All,
    }
  }

  /// Selected checkout: the list is required and an empty one is rejected
  /// before any storage access.
  pub fn from_required(product_ids: Vec<i64>) -> Result<Self> {
    if product_ids.is_empty() {
      return Err(AppError::Validation("No items selected for checkout".to_string()));
    }
    Ok(CheckoutSelection::Subset(product_ids))
  }
}

#[derive(Debug, FromRow)]
struct CheckoutRow {
  cart_item_id: i64,
  quantity: i32,
  product_id: i64,
  product_name: String,
  is_active: bool,
  stock_quantity: i32,
}

/// Converts the targeted cart lines into a stock debit and deletes them,
/// all-or-nothing. On any validation failure nothing is written and the
/// transaction rolls back untouched.
#[instrument(name = "cart_service::checkout", skip(pool))]
pub async fn checkout(pool: &PgPool, user_id: i64, selection: &CheckoutSelection) -> Result<()> {
  let mut tx = pool.begin().await?;
  checkout_in_tx(&mut tx, user_id, selection).await?;
  tx.commit().await?;
  info!(user_id, "checkout committed");
  Ok(())
}

/// The unit of work shared by both checkout entry points. `conn` must be a
/// transaction connection: the `FOR UPDATE` locks below are what keeps two
/// concurrent checkouts from jointly overselling the same stock.
async fn checkout_in_tx(conn: &mut PgConnection, user_id: i64, selection: &CheckoutSelection) -> Result<()> {
  // Locks both the cart lines and their product rows for the duration of
  // the transaction.
  let base = r#"
    SELECT c.id AS cart_item_id, c.quantity,
           p.id AS product_id, p.name AS product_name, p.is_active, p.stock_quantity
    FROM cart_items c
    JOIN products p ON p.id = c.product_id
    WHERE c.user_id = $1
  "#;
  let lines = match selection {
    CheckoutSelection::All => {
      sqlx::query_as::<_, CheckoutRow>(&format!("{base} ORDER BY c.created_at FOR UPDATE"))
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?
    }
    CheckoutSelection::Subset(ids) => {
      sqlx::query_as::<_, CheckoutRow>(&format!(
        "{base} AND c.product_id = ANY($2) ORDER BY c.created_at FOR UPDATE"
      ))
      .bind(user_id)
      .bind(ids)
      .fetch_all(&mut *conn)
      .await?
    }
  };

  if lines.is_empty() {
    return Err(AppError::NothingToCheckout);
  }

  // Validation pass: side-effect free. The whole selection fails on the
  // first offending product, before any stock changes.
  for line in &lines {
    if !line.is_active {
      return Err(AppError::Unavailable(line.product_name.clone()));
    }
    if line.stock_quantity < line.quantity {
      return Err(AppError::InsufficientStock(line.product_name.clone()));
    }
  }

  // Commit pass: debit stock, then drop the lines. The conditional
  // decrement re-checks stock at write time; with the rows locked above a
  // zero-row update means the store broke its own guarantee.
  for line in &lines {
    let result = sqlx::query(
      "UPDATE products SET stock_quantity = stock_quantity - $1 WHERE id = $2 AND stock_quantity >= $1",
    )
    .bind(line.quantity)
    .bind(line.product_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
      return Err(AppError::Internal(format!(
        "Concurrent stock change detected for product {}",
        line.product_id
      )));
    }
  }

  let line_ids: Vec<i64> = lines.iter().map(|l| l.cart_item_id).collect();
  sqlx::query("DELETE FROM cart_items WHERE id = ANY($1)")
    .bind(&line_ids)
    .execute(&mut *conn)
    .await?;

  Ok(())
}
