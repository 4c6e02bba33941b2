use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Represents the 'images' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    pub post_id: String,
    /// Encoded payload, usually a data URI.
    pub image: String,
    pub alt: Option<String>,
    pub caption: Option<String>,
}

/// An image joined with the owner of its post, which is who may change it.
#[derive(Debug, Clone, FromRow)]
pub struct OwnedImage {
    #[sqlx(flatten)]
    pub image: Image,
    pub post_owner_id: String,
}

impl OwnedImage {
    pub async fn find(pool: &SqlitePool, id: &str) -> Result<Option<OwnedImage>, sqlx::Error> {
        sqlx::query_as::<_, OwnedImage>(
            r#"
            SELECT i.*, p.owner_id AS post_owner_id
            FROM images i
            JOIN posts p ON p.id = i.post_id
            WHERE i.id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateImageRequest {
    pub post_id: String,
    pub image: String,
}

/// Sparse patch for an image.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateImageRequest {
    pub image_id: String,
    pub image: Option<String>,
    pub alt: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIdRequest {
    pub image_id: String,
}
