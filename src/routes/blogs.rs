//! Blog endpoints: items, categories, and the public comment surface.
//!
//! Input validation always runs before any store access, so a bad payload
//! gets a 400 even when the database is down.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{middleware::AuthUser, Role};
use crate::db::models::BlogComment;
use crate::error::ApiError;
use crate::repo::{self, blogs::MAX_COMMENTS_PER_USER};
use crate::routes::{collect_form, store_image, MessageResponse};
use crate::slug::unique_slug;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub blog_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub action: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentRequest {
    pub user_name: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentCreatedResponse {
    pub message: String,
    pub comment: BlogComment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentLikeResponse {
    pub message: String,
    pub like_count: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewCategoryRequest {
    pub title: Option<String>,
}

fn parse_categories(raw: &str) -> Result<Vec<Uuid>, ApiError> {
    serde_json::from_str::<Vec<Uuid>>(raw).map_err(|_| {
        ApiError::Validation(
            "Invalid category format. Expected a JSON array of category IDs.".to_string(),
        )
    })
}

/// A published item must be complete; drafts may be as sparse as a bare
/// title or nothing at all.
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = collect_form(multipart).await?;

    let blog_type = match form.text("type") {
        None | Some("published") => "published",
        Some("draft") => "draft",
        Some(_) => return Err(ApiError::Validation("Invalid blog type".to_string())),
    };

    let category = match form.text("category") {
        Some(raw) => parse_categories(raw)?,
        None => Vec::new(),
    };

    // An empty category array counts as missing: a published item carries at
    // least one category.
    if blog_type == "published"
        && (form.text("title").is_none()
            || form.text("description").is_none()
            || form.text("content").is_none()
            || category.is_empty())
    {
        return Err(ApiError::Validation(
            "All important fields must be filled".to_string(),
        ));
    }

    let pool = state.pool()?;

    if !category.is_empty() && !repo::blogs::categories_exist(pool, &category).await? {
        return Err(ApiError::Validation(
            "One or more category IDs are invalid.".to_string(),
        ));
    }

    let slug = unique_slug(form.text("title").unwrap_or(""), |candidate| {
        repo::blogs::slug_exists(pool, candidate)
    })
    .await?;

    let image = store_image(&state, form.image.clone(), "blog").await?;

    repo::blogs::insert(
        pool,
        repo::blogs::NewBlog {
            title: form.text("title").map(str::to_string),
            description: form.text("description").map(str::to_string),
            content: form.text("content").map(str::to_string),
            slug,
            category,
            image,
            facebook_url: form.text("facebookUrl").map(str::to_string),
            instagram_url: form.text("instagramUrl").map(str::to_string),
            x_url: form.text("xUrl").map(str::to_string),
            blog_type: blog_type.to_string(),
            user_id: Some(caller.user_id),
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Blog created successfully".to_string(),
        }),
    ))
}

/// Admins browse everything; other callers only their own items.
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let owner = if caller.role == Role::Admin {
        None
    } else {
        Some(caller.user_id)
    };
    let blogs = repo::blogs::list(
        pool,
        repo::blogs::BlogFilter {
            owner,
            blog_type: query.blog_type,
            search: query.search,
        },
    )
    .await?;
    Ok(Json(blogs))
}

pub async fn get_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let blog = repo::blogs::find_by_slug(pool, &slug).await?.ok_or_else(|| {
        ApiError::Validation("No blog item with this slug exists".to_string())
    })?;
    Ok(Json(blog))
}

/// Partial update; the slug never changes, even when the title does.
pub async fn update(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = collect_form(multipart).await?;

    let category = match form.text("category") {
        Some(raw) => Some(parse_categories(raw)?),
        None => None,
    };

    let pool = state.pool()?;

    if let Some(ids) = &category {
        if !ids.is_empty() && !repo::blogs::categories_exist(pool, ids).await? {
            return Err(ApiError::Validation(
                "One or more category IDs are invalid.".to_string(),
            ));
        }
    }

    let image = store_image(&state, form.image.clone(), "blog").await?;

    let blog = repo::blogs::update(
        pool,
        &slug,
        repo::blogs::BlogUpdate {
            title: form.text("title").map(str::to_string),
            description: form.text("description").map(str::to_string),
            content: form.text("content").map(str::to_string),
            category,
            image,
            facebook_url: form.text("facebookUrl").map(str::to_string),
            instagram_url: form.text("instagramUrl").map(str::to_string),
            x_url: form.text("xUrl").map(str::to_string),
        },
    )
    .await?
    .ok_or_else(|| ApiError::Validation("No blog item with this slug exists".to_string()))?;

    Ok(Json(blog))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    if !repo::blogs::delete_by_slug(pool, &slug).await? {
        return Err(ApiError::NotFound("Blog not found".to_string()));
    }
    Ok(Json(MessageResponse {
        message: "Blog deleted successfully".to_string(),
    }))
}

/// published ⇄ draft flip; no completeness re-check on the way back to
/// published.
pub async fn toggle_type(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let blog = repo::blogs::find_by_slug(pool, &slug).await?.ok_or_else(|| {
        ApiError::Validation("No blog item with this slug exists".to_string())
    })?;

    let new_type = if blog.blog_type == "published" {
        "draft"
    } else {
        "published"
    };
    repo::blogs::set_type(pool, &slug, new_type).await?;

    Ok(Json(MessageResponse {
        message: format!("Blog status has been changed to {new_type}"),
    }))
}

/// Anonymous like counter. `unlike` below zero is allowed here; only comment
/// counters are floored.
pub async fn like(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<LikeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let delta = match payload.action.as_deref() {
        Some("like") => 1,
        Some("unlike") => -1,
        _ => {
            return Err(ApiError::Validation(
                "Action must be either 'like' or 'unlike'".to_string(),
            ))
        }
    };

    let pool = state.pool()?;
    if !repo::blogs::adjust_like_count(pool, &slug, delta).await? {
        return Err(ApiError::Validation(
            "No blog item with this slug exists".to_string(),
        ));
    }

    Ok(Json(MessageResponse {
        message: "Blog like count updated".to_string(),
    }))
}

// --- categories ---

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<NewCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = payload
        .title
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::Validation("Title is required".to_string()))?;

    let pool = state.pool()?;

    if repo::blogs::find_category_by_title(pool, &title)
        .await?
        .is_some()
    {
        return Err(ApiError::Validation(
            "Category already exists".to_string(),
        ));
    }

    let category = repo::blogs::insert_category(pool, &title).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let categories = repo::blogs::list_categories(pool).await?;
    Ok(Json(categories))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    if !repo::blogs::delete_category(pool, id).await? {
        return Err(ApiError::NotFound("Category not found".to_string()));
    }
    Ok(Json(MessageResponse {
        message: "Category deleted successfully".to_string(),
    }))
}

// --- comments ---

/// Public, no account needed; the display name plus slug pair is capped at
/// two comments.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(payload): Json<NewCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user_name, comment) = match (payload.user_name, payload.comment) {
        (Some(u), Some(c)) if !u.is_empty() && !c.is_empty() => (u, c),
        _ => {
            return Err(ApiError::Validation(
                "Missing required fields.".to_string(),
            ))
        }
    };

    let pool = state.pool()?;

    if repo::blogs::count_comments(pool, &user_name, &slug).await? >= MAX_COMMENTS_PER_USER {
        return Err(ApiError::Authorization(
            "User has already commented twice on this blog.".to_string(),
        ));
    }

    let comment = repo::blogs::insert_comment(pool, &user_name, &comment, &slug).await?;

    Ok((
        StatusCode::CREATED,
        Json(CommentCreatedResponse {
            message: "Comment added successfully".to_string(),
            comment,
        }),
    ))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let comments = repo::blogs::list_comments(pool, &slug).await?;
    Ok(Json(comments))
}

/// The path segment doubles as the comment id on this method.
pub async fn like_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<LikeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let liked = match payload.action.as_deref() {
        Some("like") => true,
        Some("unlike") => false,
        _ => {
            return Err(ApiError::Validation(
                "Action must be either 'like' or 'unlike'".to_string(),
            ))
        }
    };

    let id: Uuid = id
        .parse()
        .map_err(|_| ApiError::Validation("Invalid comment id".to_string()))?;

    let pool = state.pool()?;
    let comment = repo::blogs::find_comment(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))?;

    let like_count = repo::blogs::next_comment_like_count(comment.like_count, liked);
    repo::blogs::set_comment_like_count(pool, id, like_count).await?;

    Ok(Json(CommentLikeResponse {
        message: "Comment like count updated".to_string(),
        like_count,
    }))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: Uuid = id
        .parse()
        .map_err(|_| ApiError::Validation("Invalid comment id".to_string()))?;

    let pool = state.pool()?;
    if !repo::blogs::delete_comment(pool, id).await? {
        return Err(ApiError::NotFound("Comment not found".to_string()));
    }
    Ok(Json(MessageResponse {
        message: "Comment deleted successfully".to_string(),
    }))
}
