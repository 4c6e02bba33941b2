// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use validator::Validate;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,

    /// Unique login e-mail. Doubles as the session principal.
    pub email: String,

    pub name: Option<String>,

    /// Argon2 password hash, `None` for accounts created through an external provider.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: Option<String>,

    pub image: Option<String>,
    pub website: Option<String>,
    pub admin: bool,
    pub frozen: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(pool)
            .await
    }
}

/// Public projection of a post or blog owner.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OwnerProfile {
    #[sqlx(rename = "owner_name")]
    pub name: Option<String>,
    #[sqlx(rename = "owner_image")]
    pub image: Option<String>,
    #[sqlx(rename = "owner_website")]
    pub website: Option<String>,
}

/// Reference to the blog a user owns, as listed for admins.
#[derive(Debug, Clone, Serialize)]
pub struct BlogRef {
    pub id: String,
    pub title: String,
}

/// User row as seen by admins: everything except the password.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub website: Option<String>,
    pub admin: bool,
    pub frozen: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub blog_id: Option<String>,
    #[serde(skip)]
    pub blog_title: Option<String>,
    #[sqlx(skip)]
    pub blog: Option<BlogRef>,
}

impl AdminUserView {
    /// Folds the joined blog columns into `blog`.
    pub fn with_blog(mut self) -> Self {
        self.blog = match (self.blog_id.take(), self.blog_title.take()) {
            (Some(id), Some(title)) => Some(BlogRef { id, title }),
            _ => None,
        };
        self
    }
}

/// Response of a successful signup.
#[derive(Debug, Serialize, FromRow)]
pub struct SignupResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

/// DTO for creating a new user (Registration).
/// Presence of `email` and `password` is checked by the handler so that a
/// missing field is a 400 rather than a deserialization failure.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Email must be a valid address."))]
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Sparse patch for the session user's own profile.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    #[validate(email(message = "Email must be a valid address."))]
    pub email: Option<String>,
    pub password: Option<String>,
    pub image: Option<String>,
    pub website: Option<String>,
}

/// Result of a profile update.
///
/// `token` is only present when the e-mail changed: the session principal
/// is the e-mail, so the old token no longer resolves to this user.
#[derive(Debug, Serialize)]
pub struct UpdateUserResponse {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebsiteQuery {
    pub email: String,
}

#[derive(Debug, Serialize, FromRow)]
pub struct WebsiteResponse {
    pub website: Option<String>,
}

/// Identifies the user an admin operation targets.
#[derive(Debug, Deserialize)]
pub struct TargetUser {
    pub email: String,
}

/// Body of `admin/update`: the caller restates who they are.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminToggleRequest {
    pub email: String,
    pub user_to_update: TargetUser,
}

/// Body of `admin/updateFrozenStatus`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreezeToggleRequest {
    pub user_to_update: TargetUser,
}
