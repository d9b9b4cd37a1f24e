use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Publication state of a catalog entry
///
/// Only published songs are served by the catalog endpoints or considered
/// by the recommender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "song_status", rename_all = "lowercase")]
pub enum SongStatus {
    Published,
    Removed,
}

/// A song in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Song {
    pub id: Uuid,
    pub title: String,
    pub singer: Option<String>,
    pub album: Option<String>,
    pub cover: Option<String>,
    pub status: SongStatus,
    /// Primary popularity metric
    pub plays: i64,
    /// Secondary popularity metric, used as the tie-break in hot ranking
    pub comment_count: i64,
    pub create_time: DateTime<Utc>,
}

/// Catalog browse ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongSort {
    /// Newest first
    #[default]
    Recent,
    /// Most played first
    Hot,
}
