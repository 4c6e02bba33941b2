// src/models/blog.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use validator::Validate;

use super::user::OwnerProfile;

/// Represents the 'blogs' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: String,

    /// Unique title, also used as the blog's public key in URLs.
    pub title: String,

    pub description: Option<String>,

    #[serde(rename = "imageURL")]
    pub image_url: Option<String>,

    /// Stored as a JSON array in the database.
    pub tags: Json<Vec<String>>,

    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blog {
    pub async fn find_by_owner(pool: &SqlitePool, owner_id: &str) -> Result<Option<Blog>, sqlx::Error> {
        sqlx::query_as::<_, Blog>("SELECT * FROM blogs WHERE owner_id = ?1")
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }
}

/// A blog together with its owner's public profile.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlogWithOwner {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub blog: Blog,
    #[sqlx(flatten)]
    pub owner: OwnerProfile,
}

#[derive(Debug, Serialize)]
pub struct PostId {
    pub id: String,
}

/// Directory entry: a blog, its owner and the ids of its published posts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogListing {
    #[serde(flatten)]
    pub blog: Blog,
    pub owner: OwnerProfile,
    pub posts: Vec<PostId>,
}

/// DTO for creating a blog.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBlogRequest {
    #[validate(length(min = 1, message = "A blog title is required."))]
    pub blog_title: String,
}

/// Sparse patch for the session user's blog.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBlogRequest {
    pub blog_title: Option<String>,
    pub blog_description: Option<String>,
    pub blog_image: Option<String>,
    pub blog_tags: Option<Vec<String>>,
}

/// Lookup of a blog by its title.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogTitleRequest {
    pub blog_title: String,
}
