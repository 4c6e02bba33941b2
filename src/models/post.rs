use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, types::Json};
use validator::Validate;

use super::{image::Image, user::OwnerProfile};

/// Blog identifier that selects every blog instead of one.
pub const ALL_BLOGS: &str = "*";

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub owner_id: String,
    pub blog_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub hero_img: Option<String>,
    pub tags: Json<Vec<String>>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub async fn find(pool: &SqlitePool, id: &str) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

/// Listing projection of a post. Leaves out `content`, which can be large.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPreview {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub summary: Option<String>,
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published: bool,
    pub hero_img: Option<String>,
    #[sqlx(flatten)]
    pub owner: OwnerProfile,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BlogBanner {
    #[sqlx(rename = "blog_title")]
    pub title: String,
    #[serde(rename = "imageURL")]
    #[sqlx(rename = "blog_image_url")]
    pub image_url: Option<String>,
}

/// A full post with everything its page needs.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub post: Post,
    #[sqlx(flatten)]
    pub owner: OwnerProfile,
    #[sqlx(flatten)]
    pub blog: BlogBanner,
    #[sqlx(skip)]
    pub images: Vec<Image>,
}

/// Which blogs a listing or count covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlogScope {
    All,
    One(String),
}

impl BlogScope {
    /// Absent ids and the wildcard both mean every blog.
    pub fn from_id(blog_id: Option<&str>) -> Self {
        match blog_id {
            None | Some(ALL_BLOGS) => BlogScope::All,
            Some(id) => BlogScope::One(id.to_string()),
        }
    }

    /// Bind value for `(?n IS NULL OR blog_id = ?n)` filters.
    pub fn filter(&self) -> Option<&str> {
        match self {
            BlogScope::All => None,
            BlogScope::One(id) => Some(id),
        }
    }
}

/// Page request shared by every post listing.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    /// 1-indexed.
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: i64,
    #[validate(range(min = 1, message = "pageSize must be at least 1"))]
    pub page_size: i64,
    pub blog_id: Option<String>,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn scope(&self) -> BlogScope {
        BlogScope::from_id(self.blog_id.as_deref())
    }
}

/// Body of the post count endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountRequest {
    pub blog_id: Option<String>,
}

impl CountRequest {
    pub fn scope(&self) -> BlogScope {
        BlogScope::from_id(self.blog_id.as_deref())
    }
}

/// DTO for creating a post. A missing title is generated from the clock.
#[derive(Debug, Default, Deserialize)]
pub struct CreatePostRequest {
    pub title: Option<String>,
}

/// Sparse patch for a post.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub post_id: String,
    pub title: Option<String>,
    pub hero_img: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub published: Option<bool>,
}

/// The post a delete targets. Any client-supplied `ownerId` is ignored.
#[derive(Debug, Deserialize)]
pub struct PostRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeletePostRequest {
    pub post: PostRef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostIdRequest {
    pub post_id: String,
}
