//! Song upload pipeline
//!
//! Steps, strictly in order:
//! 1. Stage the payload to a local file
//! 2. Classify the staged file's mood
//! 3. Upload the staged file to the media store
//! 4. Insert the song row
//!
//! A failure at any step aborts the remaining ones, so a song row is only
//! written once both its mood and its URL are known. Removing the staged
//! file is left to the caller on success (it happens after the response);
//! on failure the pipeline removes it before returning. A staged file that
//! is dropped mid-run, e.g. when the request is cancelled, removes itself.

use std::sync::Arc;

use moodtunes_common::Song;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::db::songs::{insert_song, NewSong};
use crate::services::feature_extractor::{ExtractionError, MoodClassifier};
use crate::services::media_store::{MediaStore, StorageError, StoredMedia};
use crate::services::staging::{StagedFile, StagingArea};

/// Upload pipeline errors, one variant per failing step
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid upload: {0}")]
    InvalidInput(String),

    #[error("Failed to stage upload: {0}")]
    Staging(#[source] std::io::Error),

    #[error("Feature extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Media storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to persist song: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// One operator upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub title: String,
    pub artist: String,
    /// Client-side file name, used only for the staged file's extension
    pub original_file_name: Option<String>,
    pub audio: Vec<u8>,
}

impl UploadRequest {
    /// Reject uploads that cannot produce a valid song
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.title.trim().is_empty() {
            return Err(UploadError::InvalidInput("title is required".to_string()));
        }
        if self.artist.trim().is_empty() {
            return Err(UploadError::InvalidInput("artist is required".to_string()));
        }
        if self.audio.is_empty() {
            return Err(UploadError::InvalidInput("audio file is empty".to_string()));
        }
        Ok(())
    }
}

/// Result of a successful pipeline run
#[derive(Debug)]
pub struct UploadOutcome {
    pub song: Song,
    /// Still on disk; the caller discards it after responding
    pub staged: StagedFile,
}

/// Drives uploads through extraction, storage and persistence
#[derive(Clone)]
pub struct UploadPipeline {
    staging: StagingArea,
    classifier: Arc<dyn MoodClassifier>,
    store: Arc<dyn MediaStore>,
    db: SqlitePool,
}

impl UploadPipeline {
    pub fn new(
        staging: StagingArea,
        classifier: Arc<dyn MoodClassifier>,
        store: Arc<dyn MediaStore>,
        db: SqlitePool,
    ) -> Self {
        Self {
            staging,
            classifier,
            store,
            db,
        }
    }

    /// Run steps 1-4 for one upload
    pub async fn run(&self, request: UploadRequest) -> Result<UploadOutcome, UploadError> {
        request.validate()?;

        let staged = self
            .staging
            .stage(&request.audio, request.original_file_name.as_deref())
            .await
            .map_err(UploadError::Staging)?;

        match self.process(&request, &staged).await {
            Ok(song) => Ok(UploadOutcome { song, staged }),
            Err(e) => {
                tracing::warn!(
                    title = %request.title,
                    error = %e,
                    "Upload pipeline failed"
                );
                staged.discard().await;
                Err(e)
            }
        }
    }

    async fn process(
        &self,
        request: &UploadRequest,
        staged: &StagedFile,
    ) -> Result<Song, UploadError> {
        tracing::debug!(path = %staged.path().display(), "Classifying staged upload");
        let features = self.classifier.classify(staged.path()).await?;

        let remote_name = format!("{}{}", Uuid::new_v4(), staged.extension_suffix());
        tracing::debug!(remote_name = %remote_name, "Uploading staged file");
        let media = self.store.upload(staged.path(), &remote_name).await?;

        let new_song = NewSong {
            title: request.title.trim().to_string(),
            artist: request.artist.trim().to_string(),
            audio_url: media.url.clone(),
            mood: features.mood,
        };

        let song = match insert_song(&self.db, &new_song).await {
            Ok(song) => song,
            Err(e) => {
                self.compensate(&media).await;
                return Err(UploadError::Persistence(e));
            }
        };

        tracing::info!(
            song_id = %song.id,
            title = %song.title,
            mood = %song.mood,
            tempo = ?features.tempo,
            mean_energy = ?features.mean_energy,
            url = %song.audio_url,
            "Song created"
        );

        Ok(song)
    }

    /// Delete a remote object whose song row could not be written
    async fn compensate(&self, media: &StoredMedia) {
        let Some(file_id) = media.file_id.as_deref() else {
            tracing::error!(
                url = %media.url,
                "Song insert failed and media object has no file id; remote object orphaned"
            );
            return;
        };

        match self.store.delete(file_id).await {
            Ok(()) => tracing::info!(
                file_id = %file_id,
                "Removed remote object after failed song insert"
            ),
            Err(e) => tracing::error!(
                file_id = %file_id,
                url = %media.url,
                error = %e,
                "Failed to remove remote object after failed song insert; remote object orphaned"
            ),
        }
    }
}
