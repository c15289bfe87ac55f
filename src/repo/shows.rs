//! Shows, seasons, and episodes persistence.
//!
//! The hierarchy is held together by reference arrays: a show lists its
//! season ids, a season lists its episode ids. Multi-step writes run as
//! independent statements in a fixed order (children before parents on
//! delete, parents last on insert); a failure partway leaves earlier steps
//! in place, matching the removal semantics of each operation.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Episode, Season, Show};
use crate::error::ApiError;

#[derive(Debug, Clone, Default)]
pub struct ShowUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

/// Episode input before it has an id.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEpisode {
    pub name: String,
    pub url: String,
    pub description: String,
    #[serde(default = "default_episode_status")]
    pub status: String,
}

fn default_episode_status() -> String {
    "published".to_string()
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

// --- shows ---

pub async fn insert_show(
    pool: &PgPool,
    title: &str,
    description: &str,
    image: Option<&str>,
) -> Result<Show, ApiError> {
    let show = sqlx::query_as::<_, Show>(
        r#"
        INSERT INTO shows (title, description, image)
        VALUES ($1, $2, $3)
        RETURNING id, title, description, image, seasons
        "#,
    )
    .bind(title)
    .bind(description)
    .bind(image)
    .fetch_one(pool)
    .await?;
    Ok(show)
}

pub async fn list_shows(pool: &PgPool) -> Result<Vec<Show>, ApiError> {
    let shows = sqlx::query_as::<_, Show>(
        "SELECT id, title, description, image, seasons FROM shows",
    )
    .fetch_all(pool)
    .await?;
    Ok(shows)
}

pub async fn find_show(pool: &PgPool, id: Uuid) -> Result<Option<Show>, ApiError> {
    let show = sqlx::query_as::<_, Show>(
        "SELECT id, title, description, image, seasons FROM shows WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(show)
}

pub async fn update_show(
    pool: &PgPool,
    id: Uuid,
    update: ShowUpdate,
) -> Result<Option<Show>, ApiError> {
    let show = sqlx::query_as::<_, Show>(
        r#"
        UPDATE shows SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            image = COALESCE($3, image)
        WHERE id = $4
        RETURNING id, title, description, image, seasons
        "#,
    )
    .bind(&update.title)
    .bind(&update.description)
    .bind(&update.image)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(show)
}

/// Deletes the show row only. Seasons it referenced stay behind as orphans;
/// season deletion is the operation that cascades.
pub async fn delete_show(pool: &PgPool, id: Uuid) -> Result<bool, ApiError> {
    let result = sqlx::query("DELETE FROM shows WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn push_season(pool: &PgPool, show_id: Uuid, season_id: Uuid) -> Result<(), ApiError> {
    sqlx::query("UPDATE shows SET seasons = seasons || $1::uuid WHERE id = $2")
        .bind(season_id)
        .bind(show_id)
        .execute(pool)
        .await?;
    Ok(())
}

// --- seasons ---

pub async fn insert_season(
    pool: &PgPool,
    show_id: &str,
    episodes: &[Uuid],
) -> Result<Season, ApiError> {
    let season = sqlx::query_as::<_, Season>(
        r#"
        INSERT INTO seasons (show_id, episodes)
        VALUES ($1, $2)
        RETURNING id, show_id, episodes
        "#,
    )
    .bind(show_id)
    .bind(episodes)
    .fetch_one(pool)
    .await?;
    Ok(season)
}

pub async fn list_seasons(pool: &PgPool, show_id: &str) -> Result<Vec<Season>, ApiError> {
    let seasons = sqlx::query_as::<_, Season>(
        "SELECT id, show_id, episodes FROM seasons WHERE show_id = $1",
    )
    .bind(show_id)
    .fetch_all(pool)
    .await?;
    Ok(seasons)
}

pub async fn find_season(pool: &PgPool, id: Uuid) -> Result<Option<Season>, ApiError> {
    let season =
        sqlx::query_as::<_, Season>("SELECT id, show_id, episodes FROM seasons WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    Ok(season)
}

/// Full season teardown in dependency order: episodes first, then the season
/// row, then the back-reference in whichever show lists it.
pub async fn delete_season_cascade(pool: &PgPool, season: &Season) -> Result<(), ApiError> {
    if !season.episodes.is_empty() {
        sqlx::query("DELETE FROM episodes WHERE id = ANY($1)")
            .bind(&season.episodes)
            .execute(pool)
            .await?;
    }

    sqlx::query("DELETE FROM seasons WHERE id = $1")
        .bind(season.id)
        .execute(pool)
        .await?;

    sqlx::query("UPDATE shows SET seasons = array_remove(seasons, $1) WHERE $1 = ANY(seasons)")
        .bind(season.id)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn append_episodes(
    pool: &PgPool,
    season_id: Uuid,
    episode_ids: &[Uuid],
) -> Result<Option<Season>, ApiError> {
    let season = sqlx::query_as::<_, Season>(
        r#"
        UPDATE seasons SET episodes = episodes || $1
        WHERE id = $2
        RETURNING id, show_id, episodes
        "#,
    )
    .bind(episode_ids)
    .bind(season_id)
    .fetch_optional(pool)
    .await?;
    Ok(season)
}

/// Two independent steps: drop the reference, then the episode row. The
/// reference removal succeeds even when the episode row is already gone.
pub async fn remove_episode(
    pool: &PgPool,
    season_id: Uuid,
    episode_id: Uuid,
) -> Result<(), ApiError> {
    sqlx::query("UPDATE seasons SET episodes = array_remove(episodes, $1) WHERE id = $2")
        .bind(episode_id)
        .bind(season_id)
        .execute(pool)
        .await?;

    sqlx::query("DELETE FROM episodes WHERE id = $1")
        .bind(episode_id)
        .execute(pool)
        .await?;

    Ok(())
}

// --- episodes ---

pub async fn insert_episodes(
    pool: &PgPool,
    episodes: &[NewEpisode],
) -> Result<Vec<Episode>, ApiError> {
    let mut created = Vec::with_capacity(episodes.len());
    for episode in episodes {
        let row = sqlx::query_as::<_, Episode>(
            r#"
            INSERT INTO episodes (name, url, description, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, url, description, status
            "#,
        )
        .bind(&episode.name)
        .bind(&episode.url)
        .bind(&episode.description)
        .bind(&episode.status)
        .fetch_one(pool)
        .await?;
        created.push(row);
    }
    Ok(created)
}

/// Episodes in the order the season's reference array lists them, not
/// insertion order.
pub async fn episodes_ordered(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Episode>, ApiError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let episodes = sqlx::query_as::<_, Episode>(
        r#"
        SELECT e.id, e.name, e.url, e.description, e.status
        FROM episodes e
        JOIN UNNEST($1::uuid[]) WITH ORDINALITY AS u(id, ord) ON e.id = u.id
        ORDER BY u.ord
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(episodes)
}

pub async fn update_episode(
    pool: &PgPool,
    id: Uuid,
    update: EpisodeUpdate,
) -> Result<Option<Episode>, ApiError> {
    let episode = sqlx::query_as::<_, Episode>(
        r#"
        UPDATE episodes SET
            name = COALESCE($1, name),
            url = COALESCE($2, url),
            description = COALESCE($3, description),
            status = COALESCE($4, status)
        WHERE id = $5
        RETURNING id, name, url, description, status
        "#,
    )
    .bind(&update.name)
    .bind(&update.url)
    .bind(&update.description)
    .bind(&update.status)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(episode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_episode_defaults_to_published() {
        let episode: NewEpisode = serde_json::from_str(
            r#"{"name":"Ep 1","url":"https://cdn.example/ep1.mp4","description":"pilot"}"#,
        )
        .unwrap();
        assert_eq!(episode.status, "published");
    }

    #[test]
    fn test_episode_update_accepts_partial_payload() {
        let update: EpisodeUpdate = serde_json::from_str(r#"{"name":"Renamed"}"#).unwrap();
        assert_eq!(update.name.as_deref(), Some("Renamed"));
        assert!(update.url.is_none());
        assert!(update.status.is_none());
    }
}
