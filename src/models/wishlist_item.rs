use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WishlistItem {
  pub id: i64,
  pub user_id: i64,
  pub product_id: i64,
  pub added_at: DateTime<Utc>,
}
