//! Song database operations
//!
//! Songs are append-only: inserted once by the upload pipeline, then only
//! read by mood.

use chrono::{DateTime, Utc};
use moodtunes_common::{Mood, Song};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Fields for a song about to be created
#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub audio_url: String,
    pub mood: Mood,
}

/// Insert a song, assigning its id and creation time
pub async fn insert_song(pool: &SqlitePool, new_song: &NewSong) -> Result<Song, sqlx::Error> {
    let song = Song {
        id: Uuid::new_v4(),
        title: new_song.title.clone(),
        artist: new_song.artist.clone(),
        audio_url: new_song.audio_url.clone(),
        mood: new_song.mood.as_str().to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO songs (guid, title, artist, audio_url, mood, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(song.id.to_string())
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.audio_url)
    .bind(&song.mood)
    .bind(song.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(song)
}

/// Load every song whose stored mood equals `mood` exactly
///
/// Rows come back in the table's native order; no sort is applied.
pub async fn find_songs_by_mood(pool: &SqlitePool, mood: &str) -> Result<Vec<Song>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT guid, title, artist, audio_url, mood, created_at
        FROM songs
        WHERE mood = ?
        "#,
    )
    .bind(mood)
    .fetch_all(pool)
    .await?;

    rows.iter().map(song_from_row).collect()
}

/// Count all songs
pub async fn count_songs(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM songs")
        .fetch_one(pool)
        .await
}

fn song_from_row(row: &SqliteRow) -> Result<Song, sqlx::Error> {
    let guid_str: String = row.try_get("guid")?;
    let created_at_str: String = row.try_get("created_at")?;

    Ok(Song {
        id: Uuid::parse_str(&guid_str).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        audio_url: row.try_get("audio_url")?,
        mood: row.try_get("mood")?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc),
    })
}
