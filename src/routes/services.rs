//! Services catalog endpoints. The whole surface sits behind the admin gate.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::repo;
use crate::routes::{collect_form, store_image, MessageResponse};
use crate::state::AppState;

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let services = repo::services::list(pool).await?;
    Ok(Json(services))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: Uuid = id
        .parse()
        .map_err(|_| ApiError::Validation("Invalid service id".to_string()))?;
    let pool = state.pool()?;
    let service = repo::services::find_by_id(pool, id)
        .await?
        .ok_or_else(|| ApiError::Validation("No service with this id exists".to_string()))?;
    Ok(Json(service))
}

/// A service is never partial at creation: title, description, and image are
/// all mandatory.
pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = collect_form(multipart).await?;

    let (title, description) = match (form.text("title"), form.text("description")) {
        (Some(t), Some(d)) if form.image.is_some() => (t.to_string(), d.to_string()),
        _ => {
            return Err(ApiError::Validation(
                "All fields must be complete".to_string(),
            ))
        }
    };

    let pool = state.pool()?;
    let image = store_image(&state, form.image.clone(), "services")
        .await?
        .ok_or_else(|| ApiError::Validation("All fields must be complete".to_string()))?;

    let service = repo::services::insert(pool, &title, &description, &image).await?;
    Ok((StatusCode::CREATED, Json(service)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let id: Uuid = id
        .parse()
        .map_err(|_| ApiError::Validation("Invalid service id".to_string()))?;
    let form = collect_form(multipart).await?;

    let pool = state.pool()?;
    let image = store_image(&state, form.image.clone(), "services").await?;

    let service = repo::services::update(
        pool,
        id,
        repo::services::ServiceUpdate {
            title: form.text("title").map(str::to_string),
            description: form.text("description").map(str::to_string),
            image,
        },
    )
    .await?
    .ok_or_else(|| ApiError::Validation("No service with this id exists".to_string()))?;

    Ok(Json(service))
}

/// Always answers success, present or not; removal is idempotent.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: Uuid = id
        .parse()
        .map_err(|_| ApiError::Validation("Invalid service id".to_string()))?;
    let pool = state.pool()?;
    repo::services::delete(pool, id).await?;
    Ok(Json(MessageResponse {
        message: "Service deleted successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/api/services", get(list))
            .route("/api/services/{id}", get(get_by_id).delete(delete))
            .with_state(AppState::for_tests())
    }

    async fn send(app: Router, method: Method, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_malformed_id_is_a_validation_error() {
        let (status, body) = send(app(), Method::GET, "/api/services/not-a-uuid").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid service id");
    }

    #[tokio::test]
    async fn test_listing_without_database_is_unavailable() {
        let (status, _) = send(app(), Method::GET, "/api/services").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
