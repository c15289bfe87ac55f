//! Shows, seasons, and episodes.
//!
//! Show CRUD mirrors the services surface; the season endpoints carry the
//! reference-array consistency work (batch episode creation, ordered reads,
//! cascade on season delete).

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::{Episode, Season};
use crate::error::ApiError;
use crate::repo::{self, shows::NewEpisode};
use crate::routes::{collect_form, store_image, MessageResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSeasonRequest {
    pub show_id: Option<String>,
    #[serde(default)]
    pub episodes: Vec<NewEpisode>,
}

#[derive(Debug, Deserialize)]
pub struct AddEpisodesRequest {
    #[serde(default)]
    pub episodes: Vec<NewEpisode>,
}

#[derive(Debug, Serialize)]
pub struct SeasonCreatedResponse {
    pub message: String,
    pub season: Season,
    pub episodes: Vec<Episode>,
}

// --- shows ---

pub async fn create(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = collect_form(multipart).await?;

    let (title, description) = match (form.text("title"), form.text("description")) {
        (Some(t), Some(d)) => (t.to_string(), d.to_string()),
        _ => {
            return Err(ApiError::Validation(
                "All fields must be filled".to_string(),
            ))
        }
    };

    let pool = state.pool()?;
    let image = store_image(&state, form.image.clone(), "shows").await?;

    let show = repo::shows::insert_show(pool, &title, &description, image.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(show)))
}

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let shows = repo::shows::list_shows(pool).await?;
    Ok(Json(shows))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let show = repo::shows::find_show(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Show not found".to_string()))?;
    Ok(Json(show))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = collect_form(multipart).await?;

    let pool = state.pool()?;
    let image = store_image(&state, form.image.clone(), "shows").await?;

    let show = repo::shows::update_show(
        pool,
        id,
        repo::shows::ShowUpdate {
            title: form.text("title").map(str::to_string),
            description: form.text("description").map(str::to_string),
            image,
        },
    )
    .await?
    .ok_or_else(|| ApiError::Validation("This show does not exist".to_string()))?;

    Ok(Json(show))
}

/// Removes the show row only; its seasons and their episodes stay behind.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    if !repo::shows::delete_show(pool, id).await? {
        return Err(ApiError::NotFound("Show not found".to_string()));
    }
    Ok(Json(MessageResponse {
        message: "Show deleted successfully".to_string(),
    }))
}

// --- seasons ---

/// Batch create: episodes first, then the season referencing them, then the
/// back-reference on the show. A failure partway leaves earlier rows behind.
pub async fn create_season(
    State(state): State<AppState>,
    Json(payload): Json<NewSeasonRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let show_id = payload
        .show_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("showId is required".to_string()))?;
    let show_uuid: Uuid = show_id
        .parse()
        .map_err(|_| ApiError::Validation("Invalid show id".to_string()))?;

    if payload.episodes.is_empty() {
        return Err(ApiError::Validation(
            "A season must contain at least one episode".to_string(),
        ));
    }

    let pool = state.pool()?;

    let episodes = repo::shows::insert_episodes(pool, &payload.episodes).await?;
    let episode_ids: Vec<Uuid> = episodes.iter().map(|e| e.id).collect();
    let season = repo::shows::insert_season(pool, &show_id, &episode_ids).await?;
    repo::shows::push_season(pool, show_uuid, season.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(SeasonCreatedResponse {
            message: "Season created successfully".to_string(),
            season,
            episodes,
        }),
    ))
}

pub async fn list_seasons(
    State(state): State<AppState>,
    Path(show_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let seasons = repo::shows::list_seasons(pool, &show_id).await?;
    Ok(Json(seasons))
}

pub async fn delete_season(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let season = repo::shows::find_season(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Season not found".to_string()))?;

    repo::shows::delete_season_cascade(pool, &season).await?;

    Ok(Json(MessageResponse {
        message: "Season deleted successfully".to_string(),
    }))
}

pub async fn add_episodes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddEpisodesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.episodes.is_empty() {
        return Err(ApiError::Validation(
            "At least one episode is required".to_string(),
        ));
    }

    let pool = state.pool()?;
    repo::shows::find_season(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Season not found".to_string()))?;

    let episodes = repo::shows::insert_episodes(pool, &payload.episodes).await?;
    let episode_ids: Vec<Uuid> = episodes.iter().map(|e| e.id).collect();
    repo::shows::append_episodes(pool, id, &episode_ids)
        .await?
        .ok_or_else(|| ApiError::NotFound("Season not found".to_string()))?;

    Ok(Json(episodes))
}

/// Episodes in the season's declared order, not insertion order.
pub async fn list_episodes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let season = repo::shows::find_season(pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Season not found".to_string()))?;
    let episodes = repo::shows::episodes_ordered(pool, &season.episodes).await?;
    Ok(Json(episodes))
}

/// Drops the reference first, then the episode row; the two steps are
/// independent, so a dangling episode row never blocks the reference removal.
pub async fn delete_episode(
    State(state): State<AppState>,
    Path((season_id, episode_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    repo::shows::find_season(pool, season_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Season not found".to_string()))?;

    repo::shows::remove_episode(pool, season_id, episode_id).await?;

    Ok(Json(MessageResponse {
        message: "Episode deleted successfully".to_string(),
    }))
}

// --- episodes ---

pub async fn update_episode(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<repo::shows::EpisodeUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let pool = state.pool()?;
    let episode = repo::shows::update_episode(pool, id, payload)
        .await?
        .ok_or_else(|| ApiError::NotFound("Episode not found".to_string()))?;
    Ok(Json(episode))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request},
        routing::post,
        Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/api/shows/seasons", post(create_season))
            .with_state(AppState::for_tests())
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
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
    async fn test_season_requires_show_id() {
        let (status, body) = post_json(
            app(),
            "/api/shows/seasons",
            r#"{"episodes":[{"name":"Ep 1","url":"https://cdn.example/1.mp4","description":"pilot"}]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "showId is required");
    }

    #[tokio::test]
    async fn test_season_rejects_malformed_show_id() {
        let (status, body) = post_json(
            app(),
            "/api/shows/seasons",
            r#"{"showId":"season-one","episodes":[{"name":"Ep 1","url":"u","description":"d"}]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid show id");
    }

    #[tokio::test]
    async fn test_season_requires_episodes() {
        let (status, body) = post_json(
            app(),
            "/api/shows/seasons",
            r#"{"showId":"9f1c8f58-7c10-4e8b-b6a6-0cf0d7895f10","episodes":[]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "A season must contain at least one episode");
    }
}
