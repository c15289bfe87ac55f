//! Services catalog persistence. Plain CRUD; every service row is complete
//! (title, description, and image are all required at creation).

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::Service;
use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
pub struct ServiceUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

pub async fn list(pool: &PgPool) -> Result<Vec<Service>, ApiError> {
    let services =
        sqlx::query_as::<_, Service>("SELECT id, title, description, image FROM services")
            .fetch_all(pool)
            .await?;
    Ok(services)
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Service>, ApiError> {
    let service = sqlx::query_as::<_, Service>(
        "SELECT id, title, description, image FROM services WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(service)
}

pub async fn insert(
    pool: &PgPool,
    title: &str,
    description: &str,
    image: &str,
) -> Result<Service, ApiError> {
    let service = sqlx::query_as::<_, Service>(
        r#"
        INSERT INTO services (title, description, image)
        VALUES ($1, $2, $3)
        RETURNING id, title, description, image
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(image)
    .fetch_one(pool)
    .await?;
    Ok(service)
}

pub async fn update(
    pool: &PgPool,
    id: Uuid,
    update: ServiceUpdate,
) -> Result<Option<Service>, ApiError> {
    let service = sqlx::query_as::<_, Service>(
        r#"
        UPDATE services SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            image = COALESCE($3, image)
        WHERE id = $4
        RETURNING id, title, description, image
        "#,
    )
    .bind(&update.title)
    .bind(&update.description)
    .bind(&update.image)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(service)
}

/// Removal is idempotent; deleting an id that is already gone is not an
/// error, so the result carries no row count.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), ApiError> {
    sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
