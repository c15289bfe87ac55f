//! Row structs for the document collections (used by sqlx/serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// User account, identity plus role. `password_hash` never leaves the
/// service; responses use [`PublicUser`].
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: String,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub image: Option<String>,
    pub gender: String,
    pub reset_password_token: Option<String>,
    pub reset_password_expires: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User projection safe to return to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: String,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub image: Option<String>,
    pub gender: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            phone: u.phone,
            role: u.role,
            status: u.status,
            created_by: u.created_by,
            image: u.image,
            gender: u.gender,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Blog item. Content fields are nullable because drafts bypass the
/// required-field validation; the slug is always assigned and immutable.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub slug: String,
    pub category: Vec<Uuid>,
    pub image: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub x_url: Option<String>,
    pub read_count: i64,
    pub like_count: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub blog_type: String,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogCategory {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogComment {
    pub id: Uuid,
    pub user_name: String,
    pub comment: String,
    pub like_count: i64,
    /// Denormalized back-reference to the blog; no referential integrity.
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: String,
}

/// Show owns its seasons by reference array; deleting a show does not delete
/// the seasons it references.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub seasons: Vec<Uuid>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub id: Uuid,
    pub show_id: String,
    pub episodes: Vec<Uuid>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub description: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_user_drops_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            email: "a@b.c".into(),
            password_hash: "$2b$10$secret".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            phone: "123".into(),
            role: "author".into(),
            status: "active".into(),
            created_by: None,
            image: None,
            gender: "none".into(),
            reset_password_token: None,
            reset_password_expires: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("firstName"));
    }

    #[test]
    fn test_blog_type_serializes_as_type() {
        let blog = Blog {
            id: Uuid::new_v4(),
            title: Some("My Post".into()),
            description: None,
            content: None,
            slug: "my-post".into(),
            category: vec![],
            image: None,
            facebook_url: None,
            instagram_url: None,
            x_url: None,
            read_count: 0,
            like_count: 0,
            blog_type: "draft".into(),
            user_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value: serde_json::Value = serde_json::to_value(&blog).unwrap();
        assert_eq!(value["type"], "draft");
        assert_eq!(value["likeCount"], 0);
    }
}
