use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        image::{CreateImageRequest, Image, ImageIdRequest, OwnedImage, UpdateImageRequest},
        post::Post,
        user::User,
    },
    policy::{Decision, Policy, Principal, SESSION_USER_MISSING},
    utils::{patch::Patch, payload::ensure_field_size},
};

const NOT_POST_OWNER: &str =
    "The post being accessed doesn't belong to the user attached to this session.";

/// Attach an image to a post.
/// Requires: Login, not frozen, owner of the post.
pub async fn create_image(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_email(&pool, &principal.email).await?;
    let post = Post::find(&pool, &payload.post_id).await?;

    Policy::new(user.as_ref())
        .actor_exists(Decision::NotFound(SESSION_USER_MISSING))
        .exists(
            post.as_ref(),
            Decision::NotFound("The post you're adding an image to doesn't exist."),
        )
        .not_frozen()
        .owns(post.as_ref().map(|p| p.owner_id.as_str()), NOT_POST_OWNER)
        .check()?;

    ensure_field_size("image", &payload.image)?;

    let image = sqlx::query_as::<_, Image>(
        "INSERT INTO images (id, post_id, image) VALUES (?1, ?2, ?3) RETURNING *",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&payload.post_id)
    .bind(&payload.image)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create image: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(image_id = %image.id, post_id = %image.post_id, "image created");

    Ok((StatusCode::CREATED, Json(image)))
}

/// Apply a sparse patch to an image.
/// Requires: Login, not frozen, owner of the image's post.
pub async fn update_image(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<UpdateImageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_email(&pool, &principal.email).await?;
    let found = OwnedImage::find(&pool, &payload.image_id).await?;

    Policy::new(user.as_ref())
        .actor_exists(Decision::NotFound(SESSION_USER_MISSING))
        .exists(
            found.as_ref(),
            Decision::NotFound("The image you're trying to update doesn't exist."),
        )
        .not_frozen()
        .owns(
            found.as_ref().map(|f| f.post_owner_id.as_str()),
            "The image you're trying to update doesn't belong to you.",
        )
        .check()?;
    let Some(OwnedImage { image, .. }) = found else {
        return Err(AppError::NotFound("Image not found".to_string()));
    };

    ensure_field_size("image", &payload.image)?;
    ensure_field_size("alt", &payload.alt)?;
    ensure_field_size("caption", &payload.caption)?;

    let mut patch = Patch::new("images");
    patch
        .set("image", payload.image, &image.image)
        .set("alt", payload.alt.map(Some), &image.alt)
        .set("caption", payload.caption.map(Some), &image.caption);

    let updated = patch
        .apply_untimed::<Image>(image.id.clone(), &pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update image: {:?}", e);
            AppError::from(e)
        })?
        .unwrap_or(image);

    Ok(Json(updated))
}

/// Remove an image.
/// Requires: Login, not frozen, owner of the image's post.
pub async fn delete_image(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<ImageIdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_email(&pool, &principal.email).await?;
    let found = OwnedImage::find(&pool, &payload.image_id).await?;

    Policy::new(user.as_ref())
        .actor_exists(Decision::NotFound(SESSION_USER_MISSING))
        .exists(
            found.as_ref(),
            Decision::NotFound("The image you're trying to delete doesn't exist."),
        )
        .not_frozen()
        .owns(found.as_ref().map(|f| f.post_owner_id.as_str()), NOT_POST_OWNER)
        .check()?;

    sqlx::query("DELETE FROM images WHERE id = ?1")
        .bind(&payload.image_id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete image: {:?}", e);
            AppError::from(e)
        })?;

    tracing::info!(image_id = %payload.image_id, "image deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// A single image by id.
pub async fn get_image(
    State(pool): State<SqlitePool>,
    Json(payload): Json<ImageIdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let image = sqlx::query_as::<_, Image>("SELECT * FROM images WHERE id = ?1")
        .bind(&payload.image_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Image not found".to_string()))?;

    Ok(Json(image))
}
