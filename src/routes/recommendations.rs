use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::Song,
    routes::AppState,
    services::recommendations,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub user_id: Uuid,
}

/// Handler for the recommendation endpoint
///
/// Always answers with a list: personalized when the collaborative tier
/// has signal for this user, the popularity ranking otherwise.
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<RecommendationQuery>,
) -> AppResult<Json<Vec<Song>>> {
    tracing::info!(
        request_id = %request_id,
        user_id = %params.user_id,
        "Processing recommendation request"
    );

    let songs = recommendations::recommend_songs(
        &state.store,
        &state.cache,
        &state.config,
        params.user_id,
    )
    .await?;

    Ok(Json(songs))
}
