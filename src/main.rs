use storefront_api::config::AppConfig;
use storefront_api::state::AppState;
use storefront_api::web;

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront API server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      panic!("Configuration error: {}", e);
    }
  };

  let db_pool = match PgPool::connect(&app_config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      panic!("Database connection error: {}", e);
    }
  };

  if app_config.seed_db {
    if let Err(e) = seed_db(&db_pool).await {
      tracing::error!(error = %e, "Failed to seed database.");
    }
  }

  let app_state = AppState {
    db_pool: db_pool.clone(),
    config: app_config.clone(),
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::routes::configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}

/// Inserts a handful of demo products. Idempotent: existing SKUs are left
/// untouched.
async fn seed_db(pool: &PgPool) -> Result<(), sqlx::Error> {
  let demo: &[(&str, &str, i64, i32, &str, &str)] = &[
    ("Mechanical Keyboard", "Tenkeyless, brown switches", 8999, 25, "KB-TKL-01", "Peripherals"),
    ("Desk Lamp", "Warm LED, dimmable", 1999, 40, "LAMP-01", "Home"),
    ("USB-C Dock", "Dual display, 100W passthrough", 14999, 10, "DOCK-27", "Peripherals"),
  ];

  for (name, description, price_cents, stock, sku, category) in demo {
    sqlx::query(
      r#"
      INSERT INTO products (name, description, price_cents, stock_quantity, sku, category)
      VALUES ($1, $2, $3, $4, $5, $6)
      ON CONFLICT (sku) DO NOTHING
      "#,
    )
    .bind(name)
    .bind(description)
    .bind(price_cents)
    .bind(stock)
    .bind(sku)
    .bind(category)
    .execute(pool)
    .await?;
  }

  tracing::info!("Demo products seeded.");
  Ok(())
}
