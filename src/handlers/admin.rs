// src/handlers/admin.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::user::{AdminToggleRequest, AdminUserView, FreezeToggleRequest, User},
    policy::{Decision, Policy, Principal, SESSION_USER_MISSING},
};

const TARGET_MISSING: &str = "The user data you're trying to alter doesn't exist.";

/// Flags an admin may flip on another account.
#[derive(Debug, Clone, Copy)]
enum Flag {
    Admin,
    Frozen,
}

impl Flag {
    fn column(self) -> &'static str {
        match self {
            Flag::Admin => "admin",
            Flag::Frozen => "frozen",
        }
    }
}

/// Users joined with the blog they own, if any.
const USERS_WITH_BLOG: &str = r#"
    SELECT
        u.id, u.email, u.name, u.image, u.website, u.admin, u.frozen,
        u.created_at, u.updated_at,
        b.id AS blog_id, b.title AS blog_title
    FROM users u
    LEFT JOIN blogs b ON b.owner_id = u.id
"#;

/// Flips `flag` on the user with `email` in a single statement, then
/// reads back the admin view of that user.
async fn toggle(pool: &SqlitePool, flag: Flag, email: &str) -> Result<AdminUserView, AppError> {
    let column = flag.column();
    let sql = format!(
        "UPDATE users SET {column} = NOT {column}, updated_at = ?1 WHERE email = ?2 RETURNING id"
    );

    let user_id = sqlx::query_scalar::<_, String>(&sql)
        .bind(Utc::now())
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to toggle {}: {:?}", column, e);
            AppError::from(e)
        })?
        .ok_or(AppError::Unprocessable(TARGET_MISSING.to_string()))?;

    let user = sqlx::query_as::<_, AdminUserView>(&format!("{} WHERE u.id = ?1", USERS_WITH_BLOG))
        .bind(&user_id)
        .fetch_one(pool)
        .await?
        .with_blog();

    tracing::info!(target_email = %user.email, flag = column, "admin toggled flag");

    Ok(user)
}

/// Lists all users in the system, without password hashes.
/// Admin only.
pub async fn list_users(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AppError> {
    let caller = User::find_by_email(&pool, &principal.email).await?;
    Policy::new(caller.as_ref())
        .actor_exists(Decision::NotFound(SESSION_USER_MISSING))
        .admin()
        .check()?;

    let users = sqlx::query_as::<_, AdminUserView>(&format!(
        "{} ORDER BY u.created_at",
        USERS_WITH_BLOG
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list users: {:?}", e);
        AppError::from(e)
    })?;

    let users: Vec<AdminUserView> = users.into_iter().map(AdminUserView::with_blog).collect();

    Ok(Json(users))
}

/// Grants or revokes admin on another account.
/// Admin only, and the caller must restate their own e-mail.
pub async fn toggle_admin(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<AdminToggleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = User::find_by_email(&pool, &principal.email).await?;
    Policy::new(caller.as_ref())
        .actor_exists(Decision::NotFound(SESSION_USER_MISSING))
        .admin()
        .claims_identity(&payload.email)
        .check()?;

    let user = toggle(&pool, Flag::Admin, &payload.user_to_update.email).await?;
    Ok(Json(user))
}

/// Freezes or unfreezes another account.
/// Admin only.
pub async fn toggle_frozen(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<FreezeToggleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let caller = User::find_by_email(&pool, &principal.email).await?;
    Policy::new(caller.as_ref())
        .actor_exists(Decision::NotFound(SESSION_USER_MISSING))
        .admin()
        .check()?;

    let user = toggle(&pool, Flag::Frozen, &payload.user_to_update.email).await?;
    Ok(Json(user))
}
