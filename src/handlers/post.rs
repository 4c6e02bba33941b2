use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use chrono::{Local, Utc};
use sqlx::{SqlitePool, types::Json as SqlJson};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::{
        blog::Blog,
        image::Image,
        post::{
            BlogScope, CountRequest, CreatePostRequest, DeletePostRequest, PageRequest, Post,
            PostDetail, PostIdRequest, PostPreview, UpdatePostRequest,
        },
        user::User,
    },
    policy::{Decision, Policy, Principal, SESSION_USER_MISSING},
    utils::{jwt::principal_from_headers, patch::Patch, payload::ensure_field_size},
};

const NOT_BLOG_OWNER: &str = "You are not authorized to call this API. You do not own this blog.";

/// Title given to posts created without one, e.g. `3/7/2025 - 9:05`.
fn default_title() -> String {
    Local::now().format("%-m/%-d/%Y - %-H:%M").to_string()
}

/// Create an empty post in the session user's blog.
/// Requires: Login, owns a blog, not frozen.
pub async fn create_post(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_email(&pool, &principal.email).await?;
    let blog = match &user {
        Some(user) => Blog::find_by_owner(&pool, &user.id).await?,
        None => None,
    };

    let user = Policy::new(user.as_ref())
        .actor_exists(Decision::NotFound(SESSION_USER_MISSING))
        .exists(
            blog.as_ref(),
            Decision::Unprocessable("The user attached to this session doesn't have a blog."),
        )
        .not_frozen()
        .check()?;
    let Some(blog) = blog else {
        return Err(AppError::Unprocessable("Blog not found".to_string()));
    };

    let title = payload
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(default_title);
    ensure_field_size("title", &title)?;

    let now = Utc::now();
    let post = sqlx::query_as::<_, Post>(
        r#"
        INSERT INTO posts (id, owner_id, blog_id, title, tags, published, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, FALSE, ?6, ?6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&user.id)
    .bind(&blog.id)
    .bind(&title)
    .bind(SqlJson(Vec::<String>::new()))
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create post: {:?}", e);
        AppError::from(e)
    })?;

    tracing::info!(post_id = %post.id, blog_id = %blog.id, "post created");

    Ok((StatusCode::CREATED, Json(post)))
}

/// Apply a sparse patch to a post.
/// Requires: Login, not frozen, post owner.
pub async fn update_post(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_email(&pool, &principal.email).await?;
    let post = Post::find(&pool, &payload.post_id).await?;

    Policy::new(user.as_ref())
        .actor_exists(Decision::NotFound(SESSION_USER_MISSING))
        .exists(
            post.as_ref(),
            Decision::NotFound("The post you're trying to update doesn't exist."),
        )
        .not_frozen()
        .owns(
            post.as_ref().map(|p| p.owner_id.as_str()),
            "The post you're trying to update doesn't belong to you.",
        )
        .check()?;
    let Some(post) = post else {
        return Err(AppError::NotFound("Post not found".to_string()));
    };

    ensure_field_size("title", &payload.title)?;
    ensure_field_size("heroImg", &payload.hero_img)?;
    ensure_field_size("summary", &payload.summary)?;
    ensure_field_size("content", &payload.content)?;
    ensure_field_size("tags", &payload.tags)?;

    let mut patch = Patch::new("posts");
    patch
        .set("title", payload.title, &post.title)
        .set("hero_img", payload.hero_img.map(Some), &post.hero_img)
        .set("summary", payload.summary.map(Some), &post.summary)
        .set("content", payload.content.map(Some), &post.content)
        .set("tags", payload.tags.map(SqlJson), &post.tags)
        .set("published", payload.published, &post.published);

    let updated = match patch.apply::<Post>(post.id.clone(), &pool).await.map_err(|e| {
        tracing::error!("Failed to update post: {:?}", e);
        AppError::from(e)
    })? {
        Some(updated) => {
            tracing::info!(post_id = %updated.id, "post updated");
            updated
        }
        None => post,
    };

    Ok(Json(updated))
}

/// Delete a post. Ownership is decided from the stored row.
/// Requires: Login, not frozen, post owner.
pub async fn delete_post(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<DeletePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_email(&pool, &principal.email).await?;
    let post = Post::find(&pool, &payload.post.id).await?;

    let user = Policy::new(user.as_ref())
        .actor_exists(Decision::NotFound(SESSION_USER_MISSING))
        .exists(
            post.as_ref(),
            Decision::NotFound("The post you're trying to delete doesn't exist."),
        )
        .not_frozen()
        .owns(
            post.as_ref().map(|p| p.owner_id.as_str()),
            "You do not own this post.",
        )
        .check()?;

    sqlx::query("DELETE FROM posts WHERE id = ?1 AND owner_id = ?2")
        .bind(&payload.post.id)
        .bind(&user.id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete post: {:?}", e);
            AppError::from(e)
        })?;

    tracing::info!(post_id = %payload.post.id, "post deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Newest-first page of post previews.
async fn fetch_previews(
    pool: &SqlitePool,
    published: bool,
    scope: &BlogScope,
    page: &PageRequest,
) -> Result<Vec<PostPreview>, AppError> {
    sqlx::query_as::<_, PostPreview>(
        r#"
        SELECT
            p.id, p.owner_id, p.title, p.summary, p.tags,
            p.created_at, p.updated_at, p.published, p.hero_img,
            u.name AS owner_name, u.image AS owner_image, u.website AS owner_website
        FROM posts p
        JOIN users u ON u.id = p.owner_id
        WHERE p.published = ?1
          AND (?2 IS NULL OR p.blog_id = ?2)
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT ?3 OFFSET ?4
        "#,
    )
    .bind(published)
    .bind(scope.filter())
    .bind(page.limit())
    .bind(page.offset())
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list posts: {:?}", e);
        AppError::from(e)
    })
}

async fn count_posts(
    pool: &SqlitePool,
    published: Option<bool>,
    scope: &BlogScope,
) -> Result<i64, AppError> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM posts
        WHERE (?1 IS NULL OR blog_id = ?1)
          AND (?2 IS NULL OR published = ?2)
        "#,
    )
    .bind(scope.filter())
    .bind(published)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Requires the session user to own the concrete blog named by `scope`.
async fn authorize_blog_owner(
    pool: &SqlitePool,
    principal: &Principal,
    scope: &BlogScope,
) -> Result<(), AppError> {
    let user = User::find_by_email(pool, &principal.email).await?;
    let blog = match scope {
        BlogScope::One(id) => {
            sqlx::query_as::<_, Blog>("SELECT * FROM blogs WHERE id = ?1")
                .bind(id)
                .fetch_optional(pool)
                .await?
        }
        BlogScope::All => None,
    };

    Policy::new(user.as_ref())
        .actor_exists(Decision::NotFound(SESSION_USER_MISSING))
        .owns(blog.as_ref().map(|b| b.owner_id.as_str()), NOT_BLOG_OWNER)
        .check()?;

    Ok(())
}

/// Published previews of one blog, or of all blogs for the wildcard id.
/// Serves both `getPreviews` and the `getRecent` feed.
pub async fn get_previews(
    State(pool): State<SqlitePool>,
    Json(page): Json<PageRequest>,
) -> Result<impl IntoResponse, AppError> {
    page.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let posts = fetch_previews(&pool, true, &page.scope(), &page).await?;
    Ok(Json(posts))
}

/// Drafts of the caller's own blog.
pub async fn get_unpublished_previews(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(page): Json<PageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let scope = page.scope();
    authorize_blog_owner(&pool, &principal, &scope).await?;

    page.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let posts = fetch_previews(&pool, false, &scope, &page).await?;
    Ok(Json(posts))
}

/// Number of posts, published or not.
pub async fn post_count(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CountRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(count_posts(&pool, None, &payload.scope()).await?))
}

pub async fn published_count(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CountRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(count_posts(&pool, Some(true), &payload.scope()).await?))
}

pub async fn unpublished_count(
    State(pool): State<SqlitePool>,
    Extension(principal): Extension<Principal>,
    Json(payload): Json<CountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let scope = payload.scope();
    authorize_blog_owner(&pool, &principal, &scope).await?;

    Ok(Json(count_posts(&pool, Some(false), &scope).await?))
}

/// A single post with its owner, blog banner and images.
///
/// Drafts are only returned to their owner; everyone else gets a 404.
pub async fn get_post(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    headers: HeaderMap,
    Json(payload): Json<PostIdRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut post = sqlx::query_as::<_, PostDetail>(
        r#"
        SELECT
            p.*,
            u.name AS owner_name, u.image AS owner_image, u.website AS owner_website,
            b.title AS blog_title, b.image_url AS blog_image_url
        FROM posts p
        JOIN users u ON u.id = p.owner_id
        JOIN blogs b ON b.id = p.blog_id
        WHERE p.id = ?1
        "#,
    )
    .bind(&payload.post_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Post not found".to_string()))?;

    if !post.post.published {
        let viewer = match principal_from_headers(&headers, &config.jwt_secret) {
            Some(principal) => User::find_by_email(&pool, &principal.email).await?,
            None => None,
        };
        if viewer.map(|v| v.id) != Some(post.post.owner_id.clone()) {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
    }

    post.images = sqlx::query_as::<_, Image>("SELECT * FROM images WHERE post_id = ?1 ORDER BY rowid")
        .bind(&post.post.id)
        .fetch_all(&pool)
        .await?;

    Ok(Json(post))
}
