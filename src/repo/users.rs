//! User account persistence.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::User;
use crate::error::ApiError;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, role, status, \
     created_by, image, gender, reset_password_token, reset_password_expires, \
     created_at, updated_at";

/// Input for account creation (sign-up or admin provisioning).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role: String,
    pub created_by: Option<Uuid>,
    pub gender: String,
    pub image: Option<String>,
}

/// Partial profile update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub gender: Option<String>,
    pub image: Option<String>,
    pub password_hash: Option<String>,
}

/// Aggregate account counts for the admin dashboard.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total: i64,
    pub admins: i64,
    pub presenters: i64,
    pub authors: i64,
    pub users: i64,
    pub active: i64,
    pub pending: i64,
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn insert(pool: &PgPool, new_user: NewUser) -> Result<User, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (email, password_hash, first_name, last_name, phone,
                           role, created_by, gender, image)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(&new_user.first_name)
    .bind(&new_user.last_name)
    .bind(&new_user.phone)
    .bind(&new_user.role)
    .bind(new_user.created_by)
    .bind(&new_user.gender)
    .bind(&new_user.image)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

/// Fetch everything; the caller exclusion is a post-filter in the handler,
/// so the cost is linear in the total user count.
pub async fn list_all(pool: &PgPool) -> Result<Vec<User>, ApiError> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
    ))
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    update: UserUpdate,
) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET
            first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            phone = COALESCE($3, phone),
            role = COALESCE($4, role),
            gender = COALESCE($5, gender),
            image = COALESCE($6, image),
            password_hash = COALESCE($7, password_hash),
            updated_at = now()
        WHERE id = $8
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(&update.phone)
    .bind(&update.role)
    .bind(&update.gender)
    .bind(&update.image)
    .bind(&update.password_hash)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Idempotent flip: active ⇄ pending. Gates login and every authenticated
/// request, so the flip takes effect immediately.
pub async fn toggle_status(pool: &PgPool, id: Uuid) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        UPDATE users SET
            status = CASE WHEN status = 'active' THEN 'pending' ELSE 'active' END,
            updated_at = now()
        WHERE id = $1
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Hard delete; there is no soft-delete for accounts.
pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, ApiError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn stats(pool: &PgPool) -> Result<UserStats, ApiError> {
    let row: (i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE role = 'admin'),
               COUNT(*) FILTER (WHERE role = 'presenter'),
               COUNT(*) FILTER (WHERE role = 'author'),
               COUNT(*) FILTER (WHERE role = 'user'),
               COUNT(*) FILTER (WHERE status = 'active'),
               COUNT(*) FILTER (WHERE status = 'pending')
        FROM users
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(UserStats {
        total: row.0,
        admins: row.1,
        presenters: row.2,
        authors: row.3,
        users: row.4,
        active: row.5,
        pending: row.6,
    })
}
