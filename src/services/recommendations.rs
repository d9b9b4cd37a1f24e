use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::{
    config::Config,
    db::{Cache, CacheKey},
    error::AppResult,
    models::Song,
    services::recommender::{RatingMatrix, Recommender, RecommenderError},
    services::store::SongStore,
};

/// How long the cached fallback ranking stays fresh
const HOT_SONGS_TTL: u64 = 300;

/// Generates personalized song recommendations with a popularity fallback
///
/// Builds a bounded rating snapshot, runs user-based collaborative
/// filtering against it, and keeps only recommended songs that are still
/// published, ordered by play count. Whenever the personalized tier yields
/// nothing (unknown user, too few users, no overlapping neighbors, or every
/// candidate filtered out of the catalog), the catalog-wide hot ranking is
/// returned instead, so the endpoint only ever comes back empty on an
/// empty catalog.
pub async fn recommend_songs(
    store: &Arc<dyn SongStore>,
    cache: &Cache,
    config: &Config,
    user_id: Uuid,
) -> AppResult<Vec<Song>> {
    let start = Instant::now();

    let records = store.recent_ratings(config.recommend_rating_window).await?;
    let matrix = RatingMatrix::from_triples(
        records
            .into_iter()
            .map(|r| (r.user_id.to_string(), r.song_id.to_string(), r.score as f64)),
        config.recommend_max_users,
    );

    tracing::debug!(
        users = matrix.user_count(),
        window = config.recommend_rating_window,
        "Rating snapshot built"
    );

    let target = user_id.to_string();
    if matrix.contains_user(&target) && matrix.user_count() > 1 {
        if let Some(songs) = collaborative_songs(store, config, &matrix, &target).await? {
            tracing::info!(
                user_id = %user_id,
                count = songs.len(),
                processing_time_ms = start.elapsed().as_millis(),
                "Serving collaborative recommendations"
            );
            return Ok(songs);
        }
    } else {
        tracing::debug!(user_id = %user_id, "Target absent from snapshot or snapshot too small");
    }

    let songs = fallback_songs(store, cache, config.recommend_limit).await?;
    tracing::info!(
        user_id = %user_id,
        count = songs.len(),
        processing_time_ms = start.elapsed().as_millis(),
        "Serving popularity fallback"
    );
    Ok(songs)
}

/// Runs the collaborative tier; `None` means "no usable result, fall back"
async fn collaborative_songs(
    store: &Arc<dyn SongStore>,
    config: &Config,
    matrix: &RatingMatrix,
    target: &str,
) -> AppResult<Option<Vec<Song>>> {
    let recommender = Recommender::new(matrix);
    let item_ids = match recommender.recommend(target, config.recommend_neighbors) {
        Ok(ids) => ids,
        // The caller checks membership first, so this only fires on a race
        // between snapshot build and lookup; it degrades like any other
        // empty result.
        Err(RecommenderError::UnknownUser(id)) => {
            tracing::warn!(user_id = %id, "Target vanished from snapshot");
            return Ok(None);
        }
    };

    if item_ids.is_empty() {
        return Ok(None);
    }

    let song_ids: Vec<Uuid> = item_ids
        .iter()
        .filter_map(|id| Uuid::parse_str(id).ok())
        .collect();

    let songs = store
        .songs_by_ids(song_ids, config.recommend_limit)
        .await?;

    // All candidates may have been unpublished since they were rated.
    Ok((!songs.is_empty()).then_some(songs))
}

/// Catalog-wide popularity ranking, read through the cache
///
/// A cache read failure is logged and treated as a miss: the fallback tier
/// is the endpoint's last line of defense and must not depend on Redis
/// being reachable.
async fn fallback_songs(
    store: &Arc<dyn SongStore>,
    cache: &Cache,
    limit: i64,
) -> AppResult<Vec<Song>> {
    match cache.get_from_cache::<Vec<Song>>(&CacheKey::HotSongs).await {
        Ok(Some(songs)) => return Ok(songs),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Hot songs cache read failed"),
    }

    let songs = store.hot_songs(limit).await?;
    cache.set_in_background(&CacheKey::HotSongs, &songs, HOT_SONGS_TTL);

    Ok(songs)
}
