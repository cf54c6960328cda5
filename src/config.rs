use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  // JWT issuance
  pub jwt_secret: String,
  pub jwt_issuer: String,
  pub jwt_duration_minutes: i64,

  // Optional: seed demo products on startup
  pub seed_db: bool,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;

    let jwt_secret = get_env("JWT_SECRET")?;
    let jwt_issuer = get_env("JWT_ISSUER").unwrap_or_else(|_| "storefront-api".to_string());
    let jwt_duration_minutes = get_env("JWT_DURATION_MINUTES")
      .unwrap_or_else(|_| "60".to_string())
      .parse::<i64>()
      .map_err(|e| AppError::Config(format!("Invalid JWT_DURATION_MINUTES: {}", e)))?;

    let seed_db = get_env("SEED_DB")
      .unwrap_or_else(|_| "false".to_string())
      .parse::<bool>()
      .map_err(|e| AppError::Config(format!("Invalid SEED_DB value: {}", e)))?;

    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      jwt_secret,
      jwt_issuer,
      jwt_duration_minutes,
      seed_db,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::AppError;
  use serial_test::serial;

  // `from_env` reads process-wide environment variables, so every test here
  // is serialized and starts from a known-clean slate.
  fn clear_env() {
    for var in [
      "SERVER_HOST",
      "SERVER_PORT",
      "DATABASE_URL",
      "JWT_SECRET",
      "JWT_ISSUER",
      "JWT_DURATION_MINUTES",
      "SEED_DB",
    ] {
      env::remove_var(var);
    }
  }

  fn set_required() {
    env::set_var("DATABASE_URL", "postgres://localhost/storefront_test");
    env::set_var("JWT_SECRET", "test-secret");
  }

  #[test]
  #[serial]
  fn missing_database_url_is_a_config_error() {
    clear_env();
    env::set_var("JWT_SECRET", "test-secret");

    let err = AppConfig::from_env().unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("DATABASE_URL")));
  }

  #[test]
  #[serial]
  fn missing_jwt_secret_is_a_config_error() {
    clear_env();
    env::set_var("DATABASE_URL", "postgres://localhost/storefront_test");

    let err = AppConfig::from_env().unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("JWT_SECRET")));
  }

  #[test]
  #[serial]
  fn defaults_apply_when_only_required_vars_are_set() {
    clear_env();
    set_required();

    let config = AppConfig::from_env().unwrap();
    assert_eq!(config.server_host, "127.0.0.1");
    assert_eq!(config.server_port, 8080);
    assert_eq!(config.jwt_issuer, "storefront-api");
    assert_eq!(config.jwt_duration_minutes, 60);
    assert!(!config.seed_db);
  }

  #[test]
  #[serial]
  fn explicit_values_override_defaults() {
    clear_env();
    set_required();
    env::set_var("SERVER_HOST", "0.0.0.0");
    env::set_var("SERVER_PORT", "9090");
    env::set_var("JWT_ISSUER", "storefront-staging");
    env::set_var("JWT_DURATION_MINUTES", "15");
    env::set_var("SEED_DB", "true");

    let config = AppConfig::from_env().unwrap();
    assert_eq!(config.server_host, "0.0.0.0");
    assert_eq!(config.server_port, 9090);
    assert_eq!(config.jwt_issuer, "storefront-staging");
    assert_eq!(config.jwt_duration_minutes, 15);
    assert!(config.seed_db);
  }

  #[test]
  #[serial]
  fn non_numeric_server_port_is_a_config_error() {
    clear_env();
    set_required();
    env::set_var("SERVER_PORT", "not-a-port");

    let err = AppConfig::from_env().unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("SERVER_PORT")));
  }

  #[test]
  #[serial]
  fn non_numeric_jwt_duration_is_a_config_error() {
    clear_env();
    set_required();
    env::set_var("JWT_DURATION_MINUTES", "soon");

    let err = AppConfig::from_env().unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("JWT_DURATION_MINUTES")));
  }
}
