use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, unique_violation},
    models::user::{UpdateUserRequest, UpdateUserResponse, User, WebsiteQuery, WebsiteResponse},
    policy::{Decision, Policy, Principal, SESSION_USER_MISSING},
    utils::{
        hash::{hash_password, is_current_password},
        jwt::sign_jwt,
        patch::Patch,
        payload::ensure_field_size,
    },
};

/// Update the session user's own profile with a sparse patch.
///
/// A password that verifies against the stored hash is left alone, so
/// resubmitting the current password never rehashes it. A changed e-mail
/// comes back with a fresh session token.
pub async fn update_user(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_email(&pool, &principal.email).await?;
    let user = Policy::new(user.as_ref())
        .actor_exists(Decision::NotFound(SESSION_USER_MISSING))
        .not_frozen()
        .check()?
        .clone();

    ensure_field_size("name", &payload.name)?;
    ensure_field_size("email", &payload.email)?;
    ensure_field_size("password", &payload.password)?;
    ensure_field_size("image", &payload.image)?;
    ensure_field_size("website", &payload.website)?;
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut patch = Patch::new("users");
    patch
        .set("name", payload.name.map(Some), &user.name)
        .set("email", payload.email, &user.email)
        .set("image", payload.image.map(Some), &user.image)
        .set("website", payload.website.map(Some), &user.website);

    if let Some(password) = payload.password.filter(|p| !p.is_empty()) {
        if !is_current_password(&password, user.password.as_deref()) {
            patch.assign("password", Some(hash_password(&password)?));
        }
    }

    let staged = patch.staged().to_vec();
    let updated = match patch.apply::<User>(user.id.clone(), &pool).await {
        Ok(Some(updated)) => {
            tracing::info!(user_id = %updated.id, fields = ?staged, "user updated");
            updated
        }
        Ok(None) => user,
        Err(e) if unique_violation(&e).is_some() => {
            return Err(AppError::Conflict("That email is already in use.".to_string()));
        }
        Err(e) => {
            tracing::error!("Failed to update user: {:?}", e);
            return Err(AppError::from(e));
        }
    };

    let token = if updated.email != principal.email {
        Some(sign_jwt(&updated.email, &config.jwt_secret, config.jwt_expiration)?)
    } else {
        None
    };

    Ok(Json(UpdateUserResponse {
        user: updated,
        token,
    }))
}

/// Delete the session user's account.
/// The store cascades the delete to their blog, posts and images.
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE email = ?1")
        .bind(&principal.email)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete user: {:?}", e);
            AppError::from(e)
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(SESSION_USER_MISSING.to_string()));
    }

    tracing::info!(email = %principal.email, "user deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// A user's public website.
pub async fn get_website(
    State(pool): State<SqlitePool>,
    Query(query): Query<WebsiteQuery>,
) -> Result<impl IntoResponse, AppError> {
    let website = sqlx::query_as::<_, WebsiteResponse>("SELECT website FROM users WHERE email = ?1")
        .bind(&query.email)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(website))
}
