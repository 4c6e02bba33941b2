// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, unique_violation},
    models::user::{LoginRequest, SignupRequest, SignupResponse, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
        payload::ensure_field_size,
    },
};

/// Inserts a user in one statement that also applies the signup gate.
///
/// The row is written only when `allow_signups` is set or the table is
/// empty, and `admin` is computed from the same emptiness test, so the
/// first account is the only one that ever starts as admin.
/// Returns `Ok(None)` when the gate is closed.
pub async fn insert_user(
    pool: &SqlitePool,
    email: &str,
    name: Option<&str>,
    password_hash: &str,
    allow_signups: bool,
) -> Result<Option<SignupResponse>, AppError> {
    let now = Utc::now();

    sqlx::query_as::<_, SignupResponse>(
        r#"
        INSERT INTO users (id, email, name, password, admin, frozen, created_at, updated_at)
        SELECT ?1, ?2, ?3, ?4, NOT EXISTS (SELECT 1 FROM users), FALSE, ?5, ?5
        WHERE ?6 OR NOT EXISTS (SELECT 1 FROM users)
        RETURNING id, email, name
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(email)
    .bind(name)
    .bind(password_hash)
    .bind(now)
    .bind(allow_signups)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        if unique_violation(&e).is_some() {
            AppError::BadRequest("User already exists".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })
}

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created with `{id, email, name}`.
pub async fn signup(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (email, password) = match (payload.email.as_deref(), payload.password.as_deref()) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => {
            return Err(AppError::BadRequest(
                "Email and password are required".to_string(),
            ));
        }
    };

    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    ensure_field_size("email", email)?;
    ensure_field_size("password", password)?;
    ensure_field_size("username", &payload.username)?;

    let hashed_password = hash_password(password)?;

    let user = insert_user(
        &pool,
        email,
        payload.username.as_deref(),
        &hashed_password,
        config.allow_signups,
    )
    .await?
    .ok_or_else(|| AppError::Forbidden("Signups are currently disabled.".to_string()))?;

    tracing::info!(user_id = %user.id, "user signed up");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Whether signing up is currently possible.
///
/// The configured gate is overridden while no user exists yet.
pub async fn user_availability(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
) -> Result<impl IntoResponse, AppError> {
    if config.allow_signups {
        return Ok(Json(true));
    }

    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;

    Ok(Json(user_count == 0))
}

/// Authenticates a user and returns a session token.
pub async fn login(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = User::find_by_email(&pool, &payload.email)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::from(e)
        })?
        .ok_or(AppError::AuthError("User not found".to_string()))?;

    // Accounts created through an external provider have no password to check.
    let stored = user
        .password
        .as_deref()
        .ok_or(AppError::AuthError("Invalid password".to_string()))?;

    if !verify_password(&payload.password, stored)? {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_jwt(&user.email, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "admin": user.admin,
        "frozen": user.frozen
    })))
}
