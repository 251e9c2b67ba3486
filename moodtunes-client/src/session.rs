//! Capture session driver
//!
//! Owns the capture state and the collaborators (expression model, camera,
//! song query). Each event runs through [`transition`]; the resulting
//! effects are performed here and their outcomes fed back until nothing is
//! left to do.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use moodtunes_common::{Mood, Song};

use crate::capture::{transition, CameraErrorKind, CaptureEvent, CaptureState, Effect, StatusMessage};
use crate::error::Result;
use crate::expressions::ExpressionScores;

/// Facial-expression model
#[async_trait]
pub trait ExpressionDetector: Send + Sync {
    async fn load_models(&self) -> Result<()>;

    /// Scores for the single face in the current frame, `None` if no face
    async fn detect(&self) -> Result<Option<ExpressionScores>>;
}

/// Video input device
#[async_trait]
pub trait Camera: Send + Sync {
    async fn acquire(&self) -> std::result::Result<(), CameraErrorKind>;
}

/// Song lookup by mood
#[async_trait]
pub trait SongQuery: Send + Sync {
    async fn songs_for_mood(&self, mood: Mood) -> Result<Vec<Song>>;
}

/// Status currently on display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveStatus {
    pub message: StatusMessage,
    pub expires_at: Instant,
}

/// Drives one capture flow
pub struct CaptureSession {
    state: CaptureState,
    detector: Arc<dyn ExpressionDetector>,
    camera: Arc<dyn Camera>,
    songs: Arc<dyn SongQuery>,
    status: Option<ActiveStatus>,
    recommendations: Vec<Song>,
    auto_start_camera: bool,
}

impl CaptureSession {
    pub fn new(
        detector: Arc<dyn ExpressionDetector>,
        camera: Arc<dyn Camera>,
        songs: Arc<dyn SongQuery>,
    ) -> Self {
        Self {
            state: CaptureState::Idle,
            detector,
            camera,
            songs,
            status: None,
            recommendations: Vec::new(),
            auto_start_camera: true,
        }
    }

    /// Disable requesting the camera as soon as models load
    pub fn manual_camera(mut self) -> Self {
        self.auto_start_camera = false;
        self
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn status(&self) -> Option<StatusMessage> {
        self.status.map(|s| s.message)
    }

    /// Songs from the last successful query
    pub fn recommendations(&self) -> &[Song] {
        &self.recommendations
    }

    /// Load models (and, unless disabled, acquire the camera)
    pub async fn start(&mut self) -> &CaptureState {
        self.dispatch(CaptureEvent::Start).await
    }

    pub async fn request_camera(&mut self) -> &CaptureState {
        self.dispatch(CaptureEvent::RequestCamera).await
    }

    pub async fn detect_mood(&mut self) -> &CaptureState {
        self.dispatch(CaptureEvent::DetectMood).await
    }

    /// Clear the status if its display time has passed at `now`
    pub async fn expire_status(&mut self, now: Instant) {
        let Some(active) = self.status else {
            return;
        };
        if now < active.expires_at {
            return;
        }

        self.status = None;
        if matches!(active.message, StatusMessage::MoodDetected(_)) {
            self.dispatch(CaptureEvent::MoodDisplayExpired).await;
        }
    }

    /// Apply an event and run effects until the session is quiescent
    pub async fn dispatch(&mut self, event: CaptureEvent) -> &CaptureState {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            let next = transition(&self.state, event);
            if next.state != self.state {
                tracing::debug!(from = ?self.state, to = ?next.state, "Capture state changed");
            }
            self.state = next.state;

            for effect in next.effects {
                if let Some(follow_up) = self.perform(effect).await {
                    pending.push_back(follow_up);
                }
            }

            if pending.is_empty() && self.auto_start_camera && self.state == CaptureState::ModelsReady {
                tracing::info!("Models loaded, starting camera");
                pending.push_back(CaptureEvent::RequestCamera);
            }
        }

        &self.state
    }

    async fn perform(&mut self, effect: Effect) -> Option<CaptureEvent> {
        match effect {
            Effect::LoadModels => match self.detector.load_models().await {
                Ok(()) => {
                    tracing::info!("Expression models loaded");
                    Some(CaptureEvent::ModelsLoaded)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load expression models");
                    Some(CaptureEvent::ModelsLoadFailed(e.to_string()))
                }
            },
            Effect::AcquireCamera => match self.camera.acquire().await {
                Ok(()) => Some(CaptureEvent::CameraStarted),
                Err(kind) => {
                    tracing::warn!(kind = ?kind, "Camera acquisition failed");
                    Some(CaptureEvent::CameraFailed(kind))
                }
            },
            Effect::RunDetection => match self.detector.detect().await {
                Ok(scores) => Some(CaptureEvent::DetectionFinished(scores)),
                Err(e) => {
                    tracing::warn!(error = %e, "Expression detection failed");
                    Some(CaptureEvent::DetectionFinished(None))
                }
            },
            Effect::QuerySongs(mood) => {
                match self.songs.songs_for_mood(mood).await {
                    Ok(songs) => self.recommendations = songs,
                    // Previous recommendations stay on screen
                    Err(e) => tracing::warn!(mood = %mood, error = %e, "Song query failed"),
                }
                None
            }
            Effect::ShowStatus(message) => {
                tracing::debug!(status = %message, "Status");
                self.status = Some(ActiveStatus {
                    message,
                    expires_at: Instant::now() + message.timeout(),
                });
                None
            }
        }
    }
}
