use std::collections::HashMap;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use sqlx::{SqlitePool, types::Json as SqlJson};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, unique_violation},
    models::{
        blog::{
            Blog, BlogListing, BlogTitleRequest, BlogWithOwner, CreateBlogRequest, PostId,
            UpdateBlogRequest,
        },
        user::User,
    },
    policy::{Decision, Policy, Principal, SESSION_USER_MISSING},
    utils::{patch::Patch, payload::ensure_field_size},
};

const OWNER_COLUMNS: &str = "u.name AS owner_name, u.image AS owner_image, u.website AS owner_website";

/// Maps a unique-key failure on `blogs` to the matching client error.
fn blog_write_error(e: sqlx::Error, title: &str) -> AppError {
    match unique_violation(&e) {
        Some(msg) if msg.contains("owner_id") => AppError::Unprocessable(
            "Error creating blog, this user already has a blog.".to_string(),
        ),
        Some(_) => AppError::Conflict(format!("A blog titled '{}' already exists", title)),
        None => {
            tracing::error!("Failed to write blog: {:?}", e);
            AppError::from(e)
        }
    }
}

/// Create the session user's blog.
/// Requires: Login, not frozen, no blog yet.
pub async fn create_blog(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreateBlogRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_email(&pool, &principal.email).await?;
    let user = Policy::new(user.as_ref())
        .actor_exists(Decision::Unprocessable(
            "Error creating blog, this user doesn't exist.",
        ))
        .not_frozen()
        .check()?;

    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    ensure_field_size("blogTitle", &payload.blog_title)?;

    // The unique key on owner_id decides "already has a blog" atomically.
    let now = Utc::now();
    let blog = sqlx::query_as::<_, Blog>(
        r#"
        INSERT INTO blogs (id, title, tags, owner_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&payload.blog_title)
    .bind(SqlJson(Vec::<String>::new()))
    .bind(&user.id)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| blog_write_error(e, &payload.blog_title))?;

    tracing::info!(blog_id = %blog.id, owner_id = %user.id, "blog created");

    Ok((StatusCode::CREATED, Json(blog)))
}

/// Update the session user's blog with a sparse patch.
/// Requires: Login, not frozen, owns a blog.
pub async fn update_blog(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<UpdateBlogRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_email(&pool, &principal.email).await?;
    let blog = match &user {
        Some(user) => Blog::find_by_owner(&pool, &user.id).await?,
        None => None,
    };

    Policy::new(user.as_ref())
        .actor_exists(Decision::NotFound(SESSION_USER_MISSING))
        .exists(
            blog.as_ref(),
            Decision::NotFound("The user attached to this session doesn't have a blog."),
        )
        .not_frozen()
        .owns(
            blog.as_ref().map(|b| b.owner_id.as_str()),
            "This blog doesn't belong to you.",
        )
        .check()?;

    let Some(blog) = blog else {
        return Err(AppError::NotFound("Blog not found".to_string()));
    };

    ensure_field_size("blogTitle", &payload.blog_title)?;
    ensure_field_size("blogDescription", &payload.blog_description)?;
    ensure_field_size("blogImage", &payload.blog_image)?;
    ensure_field_size("blogTags", &payload.blog_tags)?;

    let attempted_title = payload.blog_title.clone().unwrap_or_default();

    let mut patch = Patch::new("blogs");
    patch
        .set("title", payload.blog_title, &blog.title)
        .set("description", payload.blog_description.map(Some), &blog.description)
        .set("image_url", payload.blog_image.map(Some), &blog.image_url)
        .set("tags", payload.blog_tags.map(SqlJson), &blog.tags);

    let updated = match patch
        .apply::<Blog>(blog.id.clone(), &pool)
        .await
        .map_err(|e| blog_write_error(e, &attempted_title))?
    {
        Some(updated) => {
            tracing::info!(blog_id = %updated.id, "blog updated");
            updated
        }
        None => blog,
    };

    Ok(Json(updated))
}

/// Directory of every blog with its owner and published post ids.
pub async fn list_blogs(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let blogs = sqlx::query_as::<_, BlogWithOwner>(&format!(
        "SELECT b.*, {} FROM blogs b JOIN users u ON u.id = b.owner_id ORDER BY b.created_at",
        OWNER_COLUMNS
    ))
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list blogs: {:?}", e);
        AppError::from(e)
    })?;

    let published: Vec<(String, String)> = sqlx::query_as(
        "SELECT blog_id, id FROM posts WHERE published = TRUE ORDER BY created_at DESC",
    )
    .fetch_all(&pool)
    .await?;

    let mut by_blog: HashMap<String, Vec<PostId>> = HashMap::new();
    for (blog_id, id) in published {
        by_blog.entry(blog_id).or_default().push(PostId { id });
    }

    let listing: Vec<BlogListing> = blogs
        .into_iter()
        .map(|row| {
            let posts = by_blog.remove(&row.blog.id).unwrap_or_default();
            BlogListing {
                blog: row.blog,
                owner: row.owner,
                posts,
            }
        })
        .collect();

    Ok(Json(listing))
}

/// Whether a blog with this title exists.
pub async fn blog_exists(
    State(pool): State<SqlitePool>,
    Json(payload): Json<BlogTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let matches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM blogs WHERE title = ?1")
        .bind(&payload.blog_title)
        .fetch_one(&pool)
        .await?;

    Ok(Json(matches > 0))
}

/// A blog by title, with its owner's public profile.
pub async fn get_blog(
    State(pool): State<SqlitePool>,
    Json(payload): Json<BlogTitleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let blog = sqlx::query_as::<_, BlogWithOwner>(&format!(
        "SELECT b.*, {} FROM blogs b JOIN users u ON u.id = b.owner_id WHERE b.title = ?1",
        OWNER_COLUMNS
    ))
    .bind(&payload.blog_title)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Blog not found".to_string()))?;

    Ok(Json(blog))
}
