use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    db::CacheKey,
    error::{AppError, AppResult},
    models::{Song, SongSort},
    routes::AppState,
};

const DEFAULT_LIST_LIMIT: i64 = 50;
const MAX_LIST_LIMIT: i64 = 200;
const SONG_DETAIL_TTL: u64 = 600;

#[derive(Debug, Deserialize)]
pub struct SongListQuery {
    pub keyword: Option<String>,
    #[serde(default)]
    pub sort: SongSort,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub user_id: Uuid,
}

/// Handler for catalog browse
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<SongListQuery>,
) -> AppResult<Json<Vec<Song>>> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let keyword = params
        .keyword
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty());

    let songs = state.store.list_songs(keyword, params.sort, limit).await?;
    Ok(Json(songs))
}

/// Handler for song detail, read through the cache
///
/// A cache read failure counts as a miss; the catalog stays authoritative.
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Song>> {
    let key = CacheKey::Song(id);
    match state.cache.get_from_cache::<Song>(&key).await {
        Ok(Some(song)) => return Ok(Json(song)),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Song cache read failed"),
    }

    let song = state
        .store
        .song_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("song {} not found", id)))?;

    state.cache.set_in_background(&key, &song, SONG_DETAIL_TTL);

    Ok(Json(song))
}

/// Handler for the play counter
///
/// Besides bumping the play count, this feeds the rating records the
/// recommender snapshots from: each play deepens the (user, song) score.
pub async fn play(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PlayRequest>,
) -> AppResult<StatusCode> {
    if request.user_id.is_nil() {
        return Err(AppError::InvalidInput(
            "user_id must not be the nil UUID".to_string(),
        ));
    }

    state.store.record_play(request.user_id, id).await?;

    tracing::debug!(song_id = %id, user_id = %request.user_id, "Play recorded");

    Ok(StatusCode::NO_CONTENT)
}
