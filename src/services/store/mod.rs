use uuid::Uuid;

/// Catalog and rating storage abstraction
///
/// The recommendation pipeline only ever touches persistence through this
/// trait: a bounded rating snapshot in, catalog subsets out. Keeping the
/// boundary narrow lets the orchestration logic run against a mock store
/// in tests and keeps the SQL in one place.
use crate::{
    error::AppResult,
    models::{RatingRecord, Song, SongSort},
};

pub mod postgres;

pub use postgres::PgSongStore;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SongStore: Send + Sync {
    /// Recent (user, song, score) rating rows, ordered by user id
    ///
    /// The row cap bounds the size of the snapshot the recommender builds;
    /// callers pass the configured window, not a user-supplied value.
    async fn recent_ratings(&self, limit: i64) -> AppResult<Vec<RatingRecord>>;

    /// Published songs among the given ids, ordered by descending play count
    async fn songs_by_ids(&self, ids: Vec<Uuid>, limit: i64) -> AppResult<Vec<Song>>;

    /// Catalog-wide popularity ranking: plays first, comment count tie-break
    async fn hot_songs(&self, limit: i64) -> AppResult<Vec<Song>>;

    /// Published songs for catalog browse, optionally filtered by title substring
    async fn list_songs(
        &self,
        keyword: Option<String>,
        sort: SongSort,
        limit: i64,
    ) -> AppResult<Vec<Song>>;

    /// A single published song, `None` when the id is unknown or removed
    async fn song_by_id(&self, id: Uuid) -> AppResult<Option<Song>>;

    /// Counts a play: bumps the song's play counter and upserts the user's
    /// rating record in one transaction
    async fn record_play(&self, user_id: Uuid, song_id: Uuid) -> AppResult<()>;
}
