use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One user's intent to purchase a quantity of one product.
/// (user_id, product_id) is a natural key: at most one row per pair.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CartItem {
  pub id: i64,
  pub user_id: i64,
  pub product_id: i64,
  pub quantity: i32,
  pub is_selected: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
