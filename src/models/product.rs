use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: i64,
  pub name: String,
  pub description: String,
  pub price_cents: i64,
  pub stock_quantity: i32,
  pub sku: String,
  pub category: String,
  pub image_url: String,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}
