//! Blog, category, and comment persistence, including the consistency
//! operations with real sequencing: unique-slug probes, category set
//! validation, the per-user comment limit, and the asymmetric like counters.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Blog, BlogCategory, BlogComment};
use crate::error::ApiError;

/// A commenter may hold at most this many comments per blog slug. Keyed by
/// display name only; duplicate names across people are a known limitation.
pub const MAX_COMMENTS_PER_USER: i64 = 2;

const BLOG_COLUMNS: &str = "id, title, description, content, slug, category, image, \
     facebook_url, instagram_url, x_url, read_count, like_count, type, \
     user_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewBlog {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub slug: String,
    pub category: Vec<Uuid>,
    pub image: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub x_url: Option<String>,
    pub blog_type: String,
    pub user_id: Option<Uuid>,
}

/// Partial update; the slug is immutable once assigned and is deliberately
/// absent here.
#[derive(Debug, Clone, Default)]
pub struct BlogUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub category: Option<Vec<Uuid>>,
    pub image: Option<String>,
    pub facebook_url: Option<String>,
    pub instagram_url: Option<String>,
    pub x_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BlogFilter {
    /// Restrict to one owner (non-admin callers see their own items only).
    pub owner: Option<Uuid>,
    /// `published` or `draft`.
    pub blog_type: Option<String>,
    /// Case-insensitive substring over title, content, and description.
    pub search: Option<String>,
}

pub async fn slug_exists(pool: &PgPool, slug: String) -> Result<bool, ApiError> {
    let (exists,): (bool,) =
        sqlx::query_as("SELECT EXISTS(SELECT 1 FROM blogs WHERE slug = $1)")
            .bind(&slug)
            .fetch_one(pool)
            .await?;
    Ok(exists)
}

/// Set-containment check in one round trip: every supplied id must resolve.
pub async fn categories_exist(pool: &PgPool, ids: &[Uuid]) -> Result<bool, ApiError> {
    if ids.is_empty() {
        return Ok(true);
    }
    let (found,): (i64,) = sqlx::query_as(
        "SELECT COUNT(DISTINCT id) FROM blog_categories WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_one(pool)
    .await?;
    Ok(found == ids.len() as i64)
}

pub async fn insert(pool: &PgPool, new_blog: NewBlog) -> Result<Blog, ApiError> {
    let blog = sqlx::query_as::<_, Blog>(&format!(
        r#"
        INSERT INTO blogs (title, description, content, slug, category, image,
                           facebook_url, instagram_url, x_url, type, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {BLOG_COLUMNS}
        "#
    ))
    .bind(&new_blog.title)
    .bind(&new_blog.description)
    .bind(&new_blog.content)
    .bind(&new_blog.slug)
    .bind(&new_blog.category)
    .bind(&new_blog.image)
    .bind(&new_blog.facebook_url)
    .bind(&new_blog.instagram_url)
    .bind(&new_blog.x_url)
    .bind(&new_blog.blog_type)
    .bind(new_blog.user_id)
    .fetch_one(pool)
    .await?;
    Ok(blog)
}

pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Blog>, ApiError> {
    let blog = sqlx::query_as::<_, Blog>(&format!(
        "SELECT {BLOG_COLUMNS} FROM blogs WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(blog)
}

pub async fn list(pool: &PgPool, filter: BlogFilter) -> Result<Vec<Blog>, ApiError> {
    let blogs = sqlx::query_as::<_, Blog>(&format!(
        r#"
        SELECT {BLOG_COLUMNS} FROM blogs
        WHERE ($1::uuid IS NULL OR user_id = $1)
          AND ($2::text IS NULL OR type = $2)
          AND ($3::text IS NULL
               OR title ILIKE '%' || $3 || '%'
               OR content ILIKE '%' || $3 || '%'
               OR description ILIKE '%' || $3 || '%')
        ORDER BY created_at DESC
        "#
    ))
    .bind(filter.owner)
    .bind(&filter.blog_type)
    .bind(&filter.search)
    .fetch_all(pool)
    .await?;
    Ok(blogs)
}

pub async fn update(
    pool: &PgPool,
    slug: &str,
    update: BlogUpdate,
) -> Result<Option<Blog>, ApiError> {
    let blog = sqlx::query_as::<_, Blog>(&format!(
        r#"
        UPDATE blogs SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            content = COALESCE($3, content),
            category = COALESCE($4, category),
            image = COALESCE($5, image),
            facebook_url = COALESCE($6, facebook_url),
            instagram_url = COALESCE($7, instagram_url),
            x_url = COALESCE($8, x_url),
            updated_at = now()
        WHERE slug = $9
        RETURNING {BLOG_COLUMNS}
        "#
    ))
    .bind(&update.title)
    .bind(&update.description)
    .bind(&update.content)
    .bind(&update.category)
    .bind(&update.image)
    .bind(&update.facebook_url)
    .bind(&update.instagram_url)
    .bind(&update.x_url)
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    Ok(blog)
}

pub async fn delete_by_slug(pool: &PgPool, slug: &str) -> Result<bool, ApiError> {
    let result = sqlx::query("DELETE FROM blogs WHERE slug = $1")
        .bind(slug)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Unconditional published ⇄ draft flip. Skips required-field re-validation
/// on purpose: a draft with missing optional fields must stay publishable
/// through this path.
pub async fn set_type(pool: &PgPool, slug: &str, blog_type: &str) -> Result<bool, ApiError> {
    let result = sqlx::query("UPDATE blogs SET type = $1, updated_at = now() WHERE slug = $2")
        .bind(blog_type)
        .bind(slug)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Blog like counter: increments and decrements with no floor (the comment
/// counter is floored; the asymmetry is inherited behavior, kept on purpose).
pub async fn adjust_like_count(pool: &PgPool, slug: &str, delta: i64) -> Result<bool, ApiError> {
    let result = sqlx::query(
        "UPDATE blogs SET like_count = like_count + $1, updated_at = now() WHERE slug = $2",
    )
    .bind(delta)
    .bind(slug)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

// --- categories ---

pub async fn find_category_by_title(
    pool: &PgPool,
    title: &str,
) -> Result<Option<BlogCategory>, ApiError> {
    let category =
        sqlx::query_as::<_, BlogCategory>("SELECT id, title FROM blog_categories WHERE title = $1")
            .bind(title)
            .fetch_optional(pool)
            .await?;
    Ok(category)
}

pub async fn insert_category(pool: &PgPool, title: &str) -> Result<BlogCategory, ApiError> {
    let category = sqlx::query_as::<_, BlogCategory>(
        "INSERT INTO blog_categories (title) VALUES ($1) RETURNING id, title",
    )
    .bind(title)
    .fetch_one(pool)
    .await?;
    Ok(category)
}

pub async fn list_categories(pool: &PgPool) -> Result<Vec<BlogCategory>, ApiError> {
    let categories =
        sqlx::query_as::<_, BlogCategory>("SELECT id, title FROM blog_categories ORDER BY title")
            .fetch_all(pool)
            .await?;
    Ok(categories)
}

pub async fn find_category_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<BlogCategory>, ApiError> {
    let category =
        sqlx::query_as::<_, BlogCategory>("SELECT id, title FROM blog_categories WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(category)
}

/// Deleting a category does not clean up blog references to it; stale ids
/// simply stop resolving.
pub async fn delete_category(pool: &PgPool, id: Uuid) -> Result<bool, ApiError> {
    let result = sqlx::query("DELETE FROM blog_categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// --- comments ---

pub async fn count_comments(pool: &PgPool, user_name: &str, slug: &str) -> Result<i64, ApiError> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM blog_comments WHERE user_name = $1 AND slug = $2",
    )
    .bind(user_name)
    .bind(slug)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

pub async fn insert_comment(
    pool: &PgPool,
    user_name: &str,
    comment: &str,
    slug: &str,
) -> Result<BlogComment, ApiError> {
    let comment = sqlx::query_as::<_, BlogComment>(
        r#"
        INSERT INTO blog_comments (user_name, comment, slug)
        VALUES ($1, $2, $3)
        RETURNING id, user_name, comment, like_count, slug, created_at
        "#,
    )
    .bind(user_name)
    .bind(comment)
    .bind(slug)
    .fetch_one(pool)
    .await?;
    Ok(comment)
}

pub async fn list_comments(pool: &PgPool, slug: &str) -> Result<Vec<BlogComment>, ApiError> {
    let comments = sqlx::query_as::<_, BlogComment>(
        r#"
        SELECT id, user_name, comment, like_count, slug, created_at
        FROM blog_comments WHERE slug = $1 ORDER BY created_at DESC
        "#,
    )
    .bind(slug)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}

pub async fn find_comment(pool: &PgPool, id: Uuid) -> Result<Option<BlogComment>, ApiError> {
    let comment = sqlx::query_as::<_, BlogComment>(
        r#"
        SELECT id, user_name, comment, like_count, slug, created_at
        FROM blog_comments WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(comment)
}

pub async fn delete_comment(pool: &PgPool, id: Uuid) -> Result<bool, ApiError> {
    let result = sqlx::query("DELETE FROM blog_comments WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_comment_like_count(
    pool: &PgPool,
    id: Uuid,
    like_count: i64,
) -> Result<bool, ApiError> {
    let result = sqlx::query("UPDATE blog_comments SET like_count = $1 WHERE id = $2")
        .bind(like_count)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// New value for a comment like counter: `like` increments, `unlike`
/// decrements but never below zero.
pub fn next_comment_like_count(current: i64, like: bool) -> i64 {
    if like {
        current + 1
    } else if current > 0 {
        current - 1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_like_floor_at_zero() {
        assert_eq!(next_comment_like_count(0, true), 1);
        assert_eq!(next_comment_like_count(5, false), 4);
        assert_eq!(next_comment_like_count(0, false), 0);
        // two consecutive unlikes from 0 stay at 0
        let after = next_comment_like_count(next_comment_like_count(0, false), false);
        assert_eq!(after, 0);
    }

    #[test]
    fn test_comment_limit_constant() {
        assert_eq!(MAX_COMMENTS_PER_USER, 2);
    }
}
