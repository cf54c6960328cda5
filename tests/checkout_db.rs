//! Postgres-backed tests for the cart & checkout engine.
//!
//! These need a real database because the engine's guarantees live in the
//! storage layer (row locks, conditional decrement). Set DATABASE_URL to a
//! scratch Postgres to run them; without it each test skips cleanly.

use serial_test::serial;
use sqlx::PgPool;
use uuid::Uuid;

use storefront_api::errors::AppError;
use storefront_api::services::cart_service::{self, CheckoutSelection};

async fn test_pool() -> Option<PgPool> {
  let url = std::env::var("DATABASE_URL").ok()?;
  let pool = PgPool::connect(&url).await.ok()?;
  sqlx::raw_sql(include_str!("../schema.sql"))
    .execute(&pool)
    .await
    .expect("failed to apply schema.sql");
  Some(pool)
}

macro_rules! require_pool {
  () => {
    match test_pool().await {
      Some(pool) => pool,
      None => {
        eprintln!("DATABASE_URL not set; skipping DB-backed test");
        return;
      }
    }
  };
}

async fn create_user(pool: &PgPool) -> i64 {
  sqlx::query_scalar::<_, i64>(
    "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, 'x') RETURNING id",
  )
  .bind(format!("user_{}", Uuid::new_v4().simple()))
  .bind("test@example.com")
  .fetch_one(pool)
  .await
  .unwrap()
}

async fn create_product(pool: &PgPool, name: &str, stock: i32, active: bool) -> i64 {
  sqlx::query_scalar::<_, i64>(
    r#"
    INSERT INTO products (name, price_cents, stock_quantity, sku, is_active)
    VALUES ($1, 1000, $2, $3, $4)
    RETURNING id
    "#,
  )
  .bind(name)
  .bind(stock)
  .bind(format!("SKU-{}", Uuid::new_v4().simple()))
  .bind(active)
  .fetch_one(pool)
  .await
  .unwrap()
}

async fn stock_of(pool: &PgPool, product_id: i64) -> i32 {
  sqlx::query_scalar::<_, i32>("SELECT stock_quantity FROM products WHERE id = $1")
    .bind(product_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

async fn line_count(pool: &PgPool, user_id: i64) -> i64 {
  sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

// Scenario A: adding to an empty cart creates the line but never debits
// stock (cart quantities are a soft hold).
#[tokio::test]
#[serial]
async fn add_creates_line_without_debiting_stock() {
  let pool = require_pool!();
  let user = create_user(&pool).await;
  let product = create_product(&pool, "Widget", 10, true).await;

  let line = cart_service::add_to_cart(&pool, user, product, 3).await.unwrap();
  assert_eq!(line.quantity, 3);
  assert_eq!(line.product.id, product);
  assert_eq!(stock_of(&pool, product).await, 10);
}

// Uniqueness: a second add merges into the existing line, and the stock
// check is against the merged total.
#[tokio::test]
#[serial]
async fn add_merges_lines_and_checks_combined_total() {
  let pool = require_pool!();
  let user = create_user(&pool).await;
  let product = create_product(&pool, "Widget", 4, true).await;

  cart_service::add_to_cart(&pool, user, product, 3).await.unwrap();
  let err = cart_service::add_to_cart(&pool, user, product, 2).await.unwrap_err();
  assert!(matches!(err, AppError::InsufficientStock(_)), "got {err:?}");

  let line = cart_service::add_to_cart(&pool, user, product, 1).await.unwrap();
  assert_eq!(line.quantity, 4);
  assert_eq!(line_count(&pool, user).await, 1);
}

#[tokio::test]
#[serial]
async fn add_rejects_missing_inactive_and_nonpositive() {
  let pool = require_pool!();
  let user = create_user(&pool).await;
  let inactive = create_product(&pool, "Retired", 10, false).await;

  assert!(matches!(
    cart_service::add_to_cart(&pool, user, inactive, 1).await,
    Err(AppError::Unavailable(_))
  ));
  assert!(matches!(
    cart_service::add_to_cart(&pool, user, i64::MAX, 1).await,
    Err(AppError::NotFound(_))
  ));
  assert!(matches!(
    cart_service::add_to_cart(&pool, user, inactive, 0).await,
    Err(AppError::Validation(_))
  ));
}

// Scenario B: increase fails when stock cannot cover quantity + 1, and
// the line is left unchanged.
#[tokio::test]
#[serial]
async fn increase_respects_stock() {
  let pool = require_pool!();
  let user = create_user(&pool).await;
  let product = create_product(&pool, "Widget", 3, true).await;

  cart_service::add_to_cart(&pool, user, product, 3).await.unwrap();
  let err = cart_service::increase_quantity(&pool, user, product).await.unwrap_err();
  assert!(matches!(err, AppError::InsufficientStock(_)), "got {err:?}");

  let lines = cart_service::list_cart(&pool, user).await.unwrap();
  assert_eq!(lines[0].quantity, 3);
}

// Increasing a line that was removed out from under the caller is a 404,
// not a storage error.
#[tokio::test]
#[serial]
async fn increase_of_removed_line_is_not_found() {
  let pool = require_pool!();
  let user = create_user(&pool).await;
  let product = create_product(&pool, "Widget", 10, true).await;

  cart_service::add_to_cart(&pool, user, product, 1).await.unwrap();
  assert!(cart_service::remove_from_cart(&pool, user, product).await.unwrap());

  let err = cart_service::increase_quantity(&pool, user, product).await.unwrap_err();
  assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
#[serial]
async fn decrease_to_zero_deletes_the_line() {
  let pool = require_pool!();
  let user = create_user(&pool).await;
  let product = create_product(&pool, "Widget", 10, true).await;

  cart_service::add_to_cart(&pool, user, product, 2).await.unwrap();

  let line = cart_service::decrease_quantity(&pool, user, product).await.unwrap();
  assert_eq!(line.unwrap().quantity, 1);

  // Quantity 1 -> removed, never persisted at zero.
  assert!(cart_service::decrease_quantity(&pool, user, product).await.unwrap().is_none());
  assert_eq!(line_count(&pool, user).await, 0);

  assert!(matches!(
    cart_service::decrease_quantity(&pool, user, product).await,
    Err(AppError::NotFound(_))
  ));
}

#[tokio::test]
#[serial]
async fn remove_and_clear_are_idempotent() {
  let pool = require_pool!();
  let user = create_user(&pool).await;
  let product = create_product(&pool, "Widget", 10, true).await;

  assert!(!cart_service::remove_from_cart(&pool, user, product).await.unwrap());
  assert!(!cart_service::clear_cart(&pool, user).await.unwrap());

  cart_service::add_to_cart(&pool, user, product, 1).await.unwrap();
  assert!(cart_service::remove_from_cart(&pool, user, product).await.unwrap());
  assert!(!cart_service::remove_from_cart(&pool, user, product).await.unwrap());
}

// Scenario C: one inactive product fails the whole selection; nothing is
// debited and no line is deleted.
#[tokio::test]
#[serial]
async fn checkout_is_all_or_nothing_on_unavailable_product() {
  let pool = require_pool!();
  let user = create_user(&pool).await;
  let p1 = create_product(&pool, "Widget", 5, true).await;
  let p2 = create_product(&pool, "Gadget", 5, true).await;

  cart_service::add_to_cart(&pool, user, p1, 2).await.unwrap();
  cart_service::add_to_cart(&pool, user, p2, 1).await.unwrap();

  sqlx::query("UPDATE products SET is_active = FALSE WHERE id = $1")
    .bind(p2)
    .execute(&pool)
    .await
    .unwrap();

  let err = cart_service::checkout(&pool, user, &CheckoutSelection::All).await.unwrap_err();
  match err {
    AppError::Unavailable(name) => assert_eq!(name, "Gadget"),
    other => panic!("expected Unavailable, got {other:?}"),
  }

  assert_eq!(stock_of(&pool, p1).await, 5);
  assert_eq!(stock_of(&pool, p2).await, 5);
  assert_eq!(line_count(&pool, user).await, 2);
}

#[tokio::test]
#[serial]
async fn checkout_is_all_or_nothing_on_short_stock() {
  let pool = require_pool!();
  let user = create_user(&pool).await;
  let p1 = create_product(&pool, "Widget", 5, true).await;
  let p2 = create_product(&pool, "Gadget", 3, true).await;

  cart_service::add_to_cart(&pool, user, p1, 2).await.unwrap();
  cart_service::add_to_cart(&pool, user, p2, 3).await.unwrap();

  // Stock drops under the cart quantity after the line was added.
  sqlx::query("UPDATE products SET stock_quantity = 1 WHERE id = $1")
    .bind(p2)
    .execute(&pool)
    .await
    .unwrap();

  let err = cart_service::checkout(&pool, user, &CheckoutSelection::All).await.unwrap_err();
  match err {
    AppError::InsufficientStock(name) => assert_eq!(name, "Gadget"),
    other => panic!("expected InsufficientStock, got {other:?}"),
  }

  assert_eq!(stock_of(&pool, p1).await, 5);
  assert_eq!(line_count(&pool, user).await, 2);
}

// Scenario D: a clean checkout debits every product and deletes every line.
#[tokio::test]
#[serial]
async fn checkout_debits_stock_and_clears_lines() {
  let pool = require_pool!();
  let user = create_user(&pool).await;
  let p1 = create_product(&pool, "Widget", 5, true).await;
  let p2 = create_product(&pool, "Gadget", 1, true).await;

  cart_service::add_to_cart(&pool, user, p1, 2).await.unwrap();
  cart_service::add_to_cart(&pool, user, p2, 1).await.unwrap();

  cart_service::checkout(&pool, user, &CheckoutSelection::All).await.unwrap();

  assert_eq!(stock_of(&pool, p1).await, 3);
  assert_eq!(stock_of(&pool, p2).await, 0);
  assert_eq!(line_count(&pool, user).await, 0);
}

#[tokio::test]
#[serial]
async fn checkout_subset_leaves_other_lines_alone() {
  let pool = require_pool!();
  let user = create_user(&pool).await;
  let p1 = create_product(&pool, "Widget", 5, true).await;
  let p2 = create_product(&pool, "Gadget", 5, true).await;

  cart_service::add_to_cart(&pool, user, p1, 2).await.unwrap();
  cart_service::add_to_cart(&pool, user, p2, 1).await.unwrap();

  cart_service::checkout(&pool, user, &CheckoutSelection::Subset(vec![p1])).await.unwrap();

  assert_eq!(stock_of(&pool, p1).await, 3);
  assert_eq!(stock_of(&pool, p2).await, 5);

  let remaining = cart_service::list_cart(&pool, user).await.unwrap();
  assert_eq!(remaining.len(), 1);
  assert_eq!(remaining[0].product_id, p2);
}

#[tokio::test]
#[serial]
async fn checkout_of_empty_selection_is_an_error_without_changes() {
  let pool = require_pool!();
  let user = create_user(&pool).await;

  assert!(matches!(
    cart_service::checkout(&pool, user, &CheckoutSelection::All).await,
    Err(AppError::NothingToCheckout)
  ));

  // A filter that matches nothing behaves the same.
  let product = create_product(&pool, "Widget", 5, true).await;
  cart_service::add_to_cart(&pool, user, product, 1).await.unwrap();
  assert!(matches!(
    cart_service::checkout(&pool, user, &CheckoutSelection::Subset(vec![product + 1])).await,
    Err(AppError::NothingToCheckout)
  ));
  assert_eq!(line_count(&pool, user).await, 1);
}

// Scenario F: two concurrent checkouts race for the sole remaining unit.
// Exactly one commits; the loser observes the post-commit stock of zero.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn concurrent_checkouts_never_oversell() {
  let pool = require_pool!();
  let user_a = create_user(&pool).await;
  let user_b = create_user(&pool).await;
  let product = create_product(&pool, "Last One", 1, true).await;

  cart_service::add_to_cart(&pool, user_a, product, 1).await.unwrap();
  cart_service::add_to_cart(&pool, user_b, product, 1).await.unwrap();

  let (res_a, res_b) = tokio::join!(
    cart_service::checkout(&pool, user_a, &CheckoutSelection::All),
    cart_service::checkout(&pool, user_b, &CheckoutSelection::All),
  );

  let succeeded = [&res_a, &res_b].iter().filter(|r| r.is_ok()).count();
  assert_eq!(succeeded, 1, "exactly one checkout must win: {res_a:?} / {res_b:?}");

  let loser = if res_a.is_err() { res_a } else { res_b };
  assert!(
    matches!(loser, Err(AppError::InsufficientStock(_))),
    "loser must observe the post-commit stock: {loser:?}"
  );
  assert_eq!(stock_of(&pool, product).await, 0);
}
