use sqlx::FromRow;
use uuid::Uuid;

/// One user's accumulated play score for one song
///
/// Rows are the raw material of the rating matrix: a play increments the
/// score, so the score doubles as an implicit rating signal.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct RatingRecord {
    pub user_id: Uuid,
    pub song_id: Uuid,
    pub score: i32,
}
