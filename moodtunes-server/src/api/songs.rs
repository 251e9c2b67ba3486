//! Song API handlers
//!
//! POST /songs (multipart upload), GET /songs?mood=<label>

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        Multipart, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use moodtunes_common::Song;
use serde::{Deserialize, Serialize};

use crate::{
    db,
    error::{ApiError, ApiResult},
    services::{UploadOutcome, UploadRequest},
    AppState,
};

/// GET /songs query
#[derive(Debug, Deserialize)]
pub struct SongQuery {
    /// Missing means the empty label
    #[serde(default)]
    pub mood: Option<String>,
}

/// POST /songs response
#[derive(Debug, Serialize)]
pub struct CreateSongResponse {
    pub message: String,
    pub song: Song,
}

/// GET /songs response
#[derive(Debug, Serialize)]
pub struct SongListResponse {
    pub message: String,
    pub songs: Vec<Song>,
}

/// POST /songs
///
/// Runs the upload pipeline. Returns 201 once the song row exists; the
/// staged file is removed afterwards on a detached task.
pub async fn create_song(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<CreateSongResponse>)> {
    let multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let request = read_upload_form(multipart).await?;

    tracing::info!(
        title = %request.title,
        artist = %request.artist,
        bytes = request.audio.len(),
        "Song upload received"
    );

    let UploadOutcome { song, staged } = state.pipeline.run(request).await?;

    tokio::spawn(staged.discard());

    Ok((
        StatusCode::CREATED,
        Json(CreateSongResponse {
            message: "Song created successfully".to_string(),
            song,
        }),
    ))
}

/// GET /songs?mood=<label>
///
/// Exact label match; unknown or empty labels yield an empty list.
pub async fn list_songs(
    State(state): State<AppState>,
    query: Result<Query<SongQuery>, QueryRejection>,
) -> ApiResult<Json<SongListResponse>> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let mood = query.mood.unwrap_or_default();
    let songs = db::songs::find_songs_by_mood(&state.db, &mood).await?;

    tracing::debug!(mood = %mood, count = songs.len(), "Songs fetched");

    Ok(Json(SongListResponse {
        message: "Songs fetched successfully".to_string(),
        songs,
    }))
}

/// Collect `title`, `artist` and `audio` from the multipart body
///
/// Unknown fields are ignored. Missing fields are rejected here, before any
/// pipeline step runs.
async fn read_upload_form(mut multipart: Multipart) -> ApiResult<UploadRequest> {
    let mut title: Option<String> = None;
    let mut artist: Option<String> = None;
    let mut audio: Option<(Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Malformed multipart body", e))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "title" | "artist" => {
                let value = field.text().await.map_err(|e| {
                    multipart_error(&format!("Failed to read field {}", field_name), e)
                })?;
                if field_name == "title" {
                    title = Some(value);
                } else {
                    artist = Some(value);
                }
            }
            "audio" => {
                let file_name = field.file_name().map(|s| s.to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Failed to read audio file", e))?;
                audio = Some((file_name, bytes.to_vec()));
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown upload field");
            }
        }
    }

    let title = title.ok_or_else(|| ApiError::BadRequest("Missing field: title".to_string()))?;
    let artist = artist.ok_or_else(|| ApiError::BadRequest("Missing field: artist".to_string()))?;
    let (original_file_name, audio) =
        audio.ok_or_else(|| ApiError::BadRequest("Missing field: audio".to_string()))?;

    Ok(UploadRequest {
        title,
        artist,
        original_file_name,
        audio,
    })
}

/// Oversized bodies surface as multipart read errors; keep them distinct
fn multipart_error(context: &str, err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!("{}: upload body too large", context))
    } else {
        ApiError::BadRequest(format!("{}: {}", context, err.body_text()))
    }
}

/// Build song routes
pub fn song_routes() -> Router<AppState> {
    Router::new().route("/songs", get(list_songs).post(create_song))
}
