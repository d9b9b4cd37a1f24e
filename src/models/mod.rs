mod rating;
mod song;

pub use rating::RatingRecord;
pub use song::{Song, SongSort, SongStatus};
