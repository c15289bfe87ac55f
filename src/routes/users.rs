//! Account management endpoints. All of them sit behind the admin gate
//! except `me`, which any authenticated caller can hit.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::auth::{self, middleware::AuthUser, Role};
use crate::db::models::PublicUser;
use crate::error::ApiError;
use crate::repo;
use crate::routes::{collect_form, store_image, MessageResponse};
use crate::state::AppState;

/// Everyone except the caller, newest first.
pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let users: Vec<PublicUser> = repo::users::list_all(pool)
        .await?
        .into_iter()
        .filter(|u| u.id != caller.user_id)
        .map(PublicUser::from)
        .collect();
    Ok(Json(users))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = collect_form(multipart).await?;

    let (first_name, last_name, email, phone, password) = match (
        form.text("firstName"),
        form.text("lastName"),
        form.text("email"),
        form.text("phone"),
        form.text("password"),
    ) {
        (Some(f), Some(l), Some(e), Some(p), Some(pw)) => (f, l, e, p, pw),
        _ => {
            return Err(ApiError::Validation(
                "All fields must be filled".to_string(),
            ))
        }
    };

    let role = match form.text("role") {
        None => Role::User,
        Some(raw) => {
            Role::parse(raw).ok_or_else(|| ApiError::Validation("Invalid role".to_string()))?
        }
    };

    let pool = state.pool()?;

    if repo::users::find_by_email(pool, email).await?.is_some() {
        return Err(ApiError::Validation("User already exists".to_string()));
    }

    let image = store_image(&state, form.image.clone(), "users").await?;
    let password_hash = auth::hash_password(password.to_string()).await?;

    let user = repo::users::insert(
        pool,
        repo::users::NewUser {
            email: email.to_string(),
            password_hash,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            phone: phone.to_string(),
            role: role.as_str().to_string(),
            created_by: Some(caller.user_id),
            gender: form.text("gender").unwrap_or("none").to_string(),
            image,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(PublicUser::from(user))))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let user = repo::users::find_by_id(pool, caller.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(PublicUser::from(user)))
}

pub async fn stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let stats = repo::users::stats(pool).await?;
    Ok(Json(stats))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let user = repo::users::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(PublicUser::from(user)))
}

/// Partial update from form fields; a supplied password is re-hashed, a
/// supplied image replaces the stored one.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = collect_form(multipart).await?;

    if let Some(raw) = form.text("role") {
        if Role::parse(raw).is_none() {
            return Err(ApiError::Validation("Invalid role".to_string()));
        }
    }

    // No hashing and no media upload unless the store is reachable.
    let pool = state.pool()?;

    let password_hash = match form.text("password") {
        Some(pw) => Some(auth::hash_password(pw.to_string()).await?),
        None => None,
    };

    let image = store_image(&state, form.image.clone(), "users").await?;
    let user = repo::users::update_profile(
        pool,
        id,
        repo::users::UserUpdate {
            first_name: form.text("firstName").map(str::to_string),
            last_name: form.text("lastName").map(str::to_string),
            phone: form.text("phone").map(str::to_string),
            role: form.text("role").map(str::to_string),
            gender: form.text("gender").map(str::to_string),
            image,
            password_hash,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(PublicUser::from(user)))
}

pub async fn toggle_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let user = repo::users::toggle_status(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(MessageResponse {
        message: format!("User status has been changed to {}", user.status),
    }))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    if !repo::users::delete(pool, id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    Ok(Json(MessageResponse {
        message: "User deleted successfully".to_string(),
    }))
}
