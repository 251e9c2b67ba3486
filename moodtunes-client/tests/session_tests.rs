//! Capture session driver tests with fake model, camera and song query

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use moodtunes_client::{
    Camera, CameraErrorKind, CaptureSession, CaptureState, ClientError, ExpressionDetector,
    ExpressionScores, SongQuery, StatusMessage,
};
use moodtunes_common::{Mood, Song};
use uuid::Uuid;

struct FakeDetector {
    load_fails: bool,
    frames: Mutex<VecDeque<Option<ExpressionScores>>>,
}

impl FakeDetector {
    fn with_frames(frames: Vec<Option<&str>>) -> Arc<Self> {
        Arc::new(Self {
            load_fails: false,
            frames: Mutex::new(
                frames
                    .into_iter()
                    .map(|f| f.map(|json| serde_json::from_str(json).unwrap()))
                    .collect(),
            ),
        })
    }

    fn broken() -> Arc<Self> {
        Arc::new(Self {
            load_fails: true,
            frames: Mutex::new(VecDeque::new()),
        })
    }
}

#[async_trait]
impl ExpressionDetector for FakeDetector {
    async fn load_models(&self) -> Result<(), ClientError> {
        if self.load_fails {
            Err(ClientError::Detection("model files missing".to_string()))
        } else {
            Ok(())
        }
    }

    async fn detect(&self) -> Result<Option<ExpressionScores>, ClientError> {
        Ok(self.frames.lock().unwrap().pop_front().flatten())
    }
}

struct FakeCamera(Option<CameraErrorKind>);

#[async_trait]
impl Camera for FakeCamera {
    async fn acquire(&self) -> Result<(), CameraErrorKind> {
        match self.0 {
            Some(kind) => Err(kind),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
struct FakeSongs {
    queries: Mutex<Vec<Mood>>,
}

#[async_trait]
impl SongQuery for FakeSongs {
    async fn songs_for_mood(&self, mood: Mood) -> Result<Vec<Song>, ClientError> {
        self.queries.lock().unwrap().push(mood);
        Ok(vec![Song {
            id: Uuid::new_v4(),
            title: format!("{} song", mood),
            artist: "Test Artist".to_string(),
            audio_url: format!("https://cdn.example/{}.mp3", mood),
            mood: mood.to_string(),
            created_at: Utc::now(),
        }])
    }
}

fn session(
    detector: Arc<FakeDetector>,
    camera: Option<CameraErrorKind>,
    songs: Arc<FakeSongs>,
) -> CaptureSession {
    CaptureSession::new(detector, Arc::new(FakeCamera(camera)), songs)
}

#[tokio::test]
async fn test_start_loads_models_and_opens_camera() {
    let songs = Arc::new(FakeSongs::default());
    let mut session = session(FakeDetector::with_frames(vec![]), None, songs);

    assert_eq!(session.start().await, &CaptureState::CameraActive);
    assert_eq!(session.status(), None);
}

#[tokio::test]
async fn test_manual_camera_stops_at_models_ready() {
    let songs = Arc::new(FakeSongs::default());
    let mut session = session(FakeDetector::with_frames(vec![]), None, songs).manual_camera();

    assert_eq!(session.start().await, &CaptureState::ModelsReady);
    assert_eq!(session.request_camera().await, &CaptureState::CameraActive);
}

#[tokio::test]
async fn test_detect_mood_queries_songs() {
    let songs = Arc::new(FakeSongs::default());
    let mut session = session(
        FakeDetector::with_frames(vec![Some(r#"{"happy": 0.9, "sad": 0.1, "surprised": 0.99}"#)]),
        None,
        songs.clone(),
    );
    session.start().await;

    assert_eq!(
        session.detect_mood().await,
        &CaptureState::ShowingMood(Mood::Happy)
    );
    assert_eq!(session.status(), Some(StatusMessage::MoodDetected(Mood::Happy)));
    assert_eq!(*songs.queries.lock().unwrap(), vec![Mood::Happy]);
    assert_eq!(session.recommendations().len(), 1);
    assert_eq!(session.recommendations()[0].mood, "happy");
}

#[tokio::test]
async fn test_mood_display_expires_back_to_camera_active() {
    let songs = Arc::new(FakeSongs::default());
    let mut session = session(
        FakeDetector::with_frames(vec![Some(r#"{"sad": 0.7}"#)]),
        None,
        songs,
    );
    session.start().await;
    session.detect_mood().await;

    // Still showing before the 5 s display time
    session.expire_status(Instant::now() + Duration::from_secs(1)).await;
    assert_eq!(session.state(), &CaptureState::ShowingMood(Mood::Sad));

    session.expire_status(Instant::now() + Duration::from_secs(6)).await;
    assert_eq!(session.state(), &CaptureState::CameraActive);
    assert_eq!(session.status(), None);
    // Recommendations outlive the status
    assert_eq!(session.recommendations().len(), 1);
}

#[tokio::test]
async fn test_no_face_reports_without_query() {
    let songs = Arc::new(FakeSongs::default());
    let mut session = session(FakeDetector::with_frames(vec![None]), None, songs.clone());
    session.start().await;

    assert_eq!(session.detect_mood().await, &CaptureState::CameraActive);
    assert_eq!(session.status(), Some(StatusMessage::NoFaceDetected));
    assert!(songs.queries.lock().unwrap().is_empty());

    session.expire_status(Instant::now() + Duration::from_secs(4)).await;
    assert_eq!(session.status(), None);
}

#[tokio::test]
async fn test_camera_denied() {
    let songs = Arc::new(FakeSongs::default());
    let mut session = session(
        FakeDetector::with_frames(vec![]),
        Some(CameraErrorKind::from_dom_error_name("NotAllowedError")),
        songs.clone(),
    );

    assert_eq!(
        session.start().await,
        &CaptureState::CameraError(CameraErrorKind::Denied)
    );
    assert_eq!(
        session.status(),
        Some(StatusMessage::CameraError(CameraErrorKind::Denied))
    );

    assert_eq!(
        session.detect_mood().await,
        &CaptureState::CameraError(CameraErrorKind::Denied)
    );
    assert_eq!(session.status(), Some(StatusMessage::CameraNotActive));
    assert!(songs.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_detect_before_start() {
    let songs = Arc::new(FakeSongs::default());
    let mut session = session(FakeDetector::with_frames(vec![]), None, songs);

    assert_eq!(session.detect_mood().await, &CaptureState::Idle);
    assert_eq!(session.status(), Some(StatusMessage::CameraNotActive));
}

#[tokio::test]
async fn test_model_load_failure() {
    let songs = Arc::new(FakeSongs::default());
    let mut session = session(FakeDetector::broken(), None, songs);

    let state = session.start().await.clone();
    assert!(matches!(state, CaptureState::ModelsFailed(ref msg) if msg.contains("model files missing")));

    assert!(matches!(session.request_camera().await, CaptureState::ModelsFailed(_)));
    assert_eq!(session.status(), Some(StatusMessage::ModelsNotLoaded));
}
