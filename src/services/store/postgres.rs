use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{RatingRecord, Song, SongSort},
    services::store::SongStore,
};

const SONG_COLUMNS: &str =
    "id, title, singer, album, cover, status, plays, comment_count, create_time";

/// Postgres-backed store for the song catalog and play records
pub struct PgSongStore {
    pool: PgPool,
}

impl PgSongStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl SongStore for PgSongStore {
    async fn recent_ratings(&self, limit: i64) -> AppResult<Vec<RatingRecord>> {
        let records = sqlx::query_as::<_, RatingRecord>(
            "SELECT user_id, song_id, score FROM play_records ORDER BY user_id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn songs_by_ids(&self, ids: Vec<Uuid>, limit: i64) -> AppResult<Vec<Song>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let songs = sqlx::query_as::<_, Song>(&format!(
            "SELECT {SONG_COLUMNS} FROM songs \
             WHERE id = ANY($1) AND status = 'published' \
             ORDER BY plays DESC LIMIT $2",
        ))
        .bind(ids)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(songs)
    }

    async fn hot_songs(&self, limit: i64) -> AppResult<Vec<Song>> {
        let songs = sqlx::query_as::<_, Song>(&format!(
            "SELECT {SONG_COLUMNS} FROM songs \
             WHERE status = 'published' \
             ORDER BY plays DESC, comment_count DESC LIMIT $1",
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(songs)
    }

    async fn list_songs(
        &self,
        keyword: Option<String>,
        sort: SongSort,
        limit: i64,
    ) -> AppResult<Vec<Song>> {
        let order_by = match sort {
            SongSort::Recent => "create_time DESC",
            SongSort::Hot => "plays DESC",
        };

        let pattern = keyword.map(|k| format!("%{}%", k));
        let songs = sqlx::query_as::<_, Song>(&format!(
            "SELECT {SONG_COLUMNS} FROM songs \
             WHERE status = 'published' AND ($1::text IS NULL OR title ILIKE $1) \
             ORDER BY {order_by} LIMIT $2",
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(songs)
    }

    async fn song_by_id(&self, id: Uuid) -> AppResult<Option<Song>> {
        let song = sqlx::query_as::<_, Song>(&format!(
            "SELECT {SONG_COLUMNS} FROM songs WHERE id = $1 AND status = 'published'",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(song)
    }

    async fn record_play(&self, user_id: Uuid, song_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // The UPDATE takes the row lock; concurrent plays of the same song
        // serialize here.
        let updated = sqlx::query("UPDATE songs SET plays = plays + 1 WHERE id = $1")
            .bind(song_id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("song {} not found", song_id)));
        }

        sqlx::query(
            "INSERT INTO play_records (user_id, song_id, score) VALUES ($1, $2, 1) \
             ON CONFLICT (user_id, song_id) DO UPDATE SET score = play_records.score + 1",
        )
        .bind(user_id)
        .bind(song_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
