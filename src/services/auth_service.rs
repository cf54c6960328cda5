//! Authentication: password hashing, JWT issuance/validation, and user
//! administration (approve/restrict).

use crate::config::AppConfig;
use crate::errors::{is_unique_violation, AppError, Result};
use crate::models::User;
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

const ALLOWED_ROLES: &[&str] = &["User", "Admin"];

/// Hashes a plain-text password using Argon2.
#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty.".to_string()));
  }

  let salt = SaltString::generate(&mut OsRng);
  let argon2_hasher = Argon2::default();

  match argon2_hasher.hash_password(password.as_bytes(), &salt) {
    Ok(password_hash_obj) => Ok(password_hash_obj.to_string()),
    Err(argon_err) => {
      error!(error = %argon_err, "Argon2 password hashing failed.");
      Err(AppError::Internal(format!("Password hashing process failed: {}", argon_err)))
    }
  }
}

/// Verifies a plain-text password against a stored Argon2 hash.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(hashed_password_str: &str, provided_password: &str) -> Result<bool> {
  let parsed_hash = PasswordHash::new(hashed_password_str).map_err(|parse_err| {
    error!(error = %parse_err, "Failed to parse stored password hash string.");
    AppError::Internal(format!("Invalid stored password hash format: {}", parse_err))
  })?;

  let argon2_verifier = Argon2::default();
  match argon2_verifier.verify_password(provided_password.as_bytes(), &parsed_hash) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(other_argon_err) => {
      error!(error = %other_argon_err, "Argon2 password verification process encountered an error.");
      Err(AppError::Internal(format!(
        "Password verification process failed: {}",
        other_argon_err
      )))
    }
  }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub sub: i64,
  pub username: String,
  pub role: String,
  pub exp: i64,
  pub iss: String,
  pub jti: String,
}

pub fn issue_token(config: &AppConfig, user: &User) -> Result<String> {
  let claims = Claims {
    sub: user.id,
    username: user.username.clone(),
    role: user.role.clone(),
    exp: (Utc::now() + Duration::minutes(config.jwt_duration_minutes)).timestamp(),
    iss: config.jwt_issuer.clone(),
    jti: Uuid::new_v4().to_string(),
  };
  encode(&Header::default(), &claims, &EncodingKey::from_secret(config.jwt_secret.as_bytes()))
    .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
}

pub fn decode_token(config: &AppConfig, token: &str) -> Result<Claims> {
  let mut validation = Validation::default();
  validation.set_issuer(&[&config.jwt_issuer]);
  decode::<Claims>(token, &DecodingKey::from_secret(config.jwt_secret.as_bytes()), &validation)
    .map(|data| data.claims)
    .map_err(|e| {
      debug!(error = %e, "Token validation failed.");
      AppError::Auth("Invalid or expired token".to_string())
    })
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
  pub username: String,
  pub email: String,
  pub password: String,
  #[serde(default)]
  pub role: Option<String>,
  #[serde(default)]
  pub image_url: Option<String>,
}

/// All login outputs in one value: token plus the account flags the client
/// needs to gate its UI.
#[derive(Debug, Serialize)]
pub struct LoginOutcome {
  pub token: String,
  pub role: String,
  pub is_approved: bool,
  pub is_restricted: bool,
}

#[instrument(name = "auth_service::register", skip(pool, req), fields(username = %req.username))]
pub async fn register(pool: &PgPool, req: &RegisterRequest) -> Result<User> {
  if req.username.trim().is_empty() || req.password.is_empty() {
    return Err(AppError::Validation("Username and password are required".to_string()));
  }

  // Unknown roles are downgraded rather than rejected, matching the
  // public registration form.
  let role = match req.role.as_deref() {
    Some(r) if ALLOWED_ROLES.contains(&r) => r,
    _ => "User",
  };

  let password_hash = hash_password(&req.password)?;

  // No exists-then-insert: the UNIQUE constraint on username is the source
  // of truth, so two concurrent registrations cannot both slip through.
  let user = sqlx::query_as::<_, User>(
    r#"
    INSERT INTO users (username, email, password_hash, role, is_approved, is_restricted, image_path)
    VALUES ($1, $2, $3, $4, $5, FALSE, $6)
    RETURNING *
    "#,
  )
  .bind(&req.username)
  .bind(&req.email)
  .bind(&password_hash)
  .bind(role)
  .bind(role == "Admin")
  .bind(&req.image_url)
  .fetch_one(pool)
  .await
  .map_err(|e| {
    if is_unique_violation(&e) {
      AppError::Validation("User already exists".to_string())
    } else {
      e.into()
    }
  })?;

  info!(user_id = user.id, "user registered");
  Ok(user)
}

#[instrument(name = "auth_service::login", skip(pool, config, password))]
pub async fn login(pool: &PgPool, config: &AppConfig, username: &str, password: &str) -> Result<LoginOutcome> {
  let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
    .bind(username)
    .fetch_optional(pool)
    .await?;

  // Same error for unknown user and wrong password.
  let user = user.ok_or_else(|| AppError::Auth("Invalid credentials".to_string()))?;
  if !verify_password(&user.password_hash, password)? {
    return Err(AppError::Auth("Invalid credentials".to_string()));
  }

  let token = issue_token(config, &user)?;
  Ok(LoginOutcome {
    token,
    role: user.role,
    is_approved: user.is_approved,
    is_restricted: user.is_restricted,
  })
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub image_url: Option<String>,
}

/// Updates the caller's username and/or profile image URL. Absent or blank
/// fields leave the stored value alone.
#[instrument(name = "auth_service::update_profile", skip(pool, req))]
pub async fn update_profile(pool: &PgPool, user_id: i64, req: &UpdateProfileRequest) -> Result<User> {
  let username = req.username.as_deref().filter(|s| !s.trim().is_empty());
  let image_url = req.image_url.as_deref().filter(|s| !s.trim().is_empty());

  let user = sqlx::query_as::<_, User>(
    r#"
    UPDATE users
    SET username = COALESCE($2, username), image_path = COALESCE($3, image_path)
    WHERE id = $1
    RETURNING *
    "#,
  )
  .bind(user_id)
  .bind(username)
  .bind(image_url)
  .fetch_optional(pool)
  .await
  .map_err(|e| {
    if is_unique_violation(&e) {
      AppError::Validation("Username already taken".to_string())
    } else {
      e.into()
    }
  })?
  .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

  info!(user_id, "profile updated");
  Ok(user)
}

pub async fn get_profile(pool: &PgPool, username: &str) -> Result<User> {
  sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
    .bind(username)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>> {
  let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id")
    .fetch_all(pool)
    .await?;
  Ok(users)
}

#[instrument(name = "auth_service::approve_user", skip(pool))]
pub async fn approve_user(pool: &PgPool, user_id: i64) -> Result<bool> {
  let result = sqlx::query("UPDATE users SET is_approved = TRUE WHERE id = $1")
    .bind(user_id)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}

#[instrument(name = "auth_service::restrict_user", skip(pool))]
pub async fn restrict_user(pool: &PgPool, user_id: i64, restrict: bool) -> Result<bool> {
  let result = sqlx::query("UPDATE users SET is_restricted = $2 WHERE id = $1")
    .bind(user_id)
    .bind(restrict)
    .execute(pool)
    .await?;
  Ok(result.rows_affected() > 0)
}
