//! Test helpers for moodtunes-server
//!
//! Fake collaborators that record their calls, an in-memory database and a
//! multipart body builder.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use moodtunes_common::Mood;
use moodtunes_server::services::{
    AudioFeatures, ExtractionError, MediaStore, MoodClassifier, StagingArea, StorageError,
    StoredMedia, UploadPipeline,
};
use moodtunes_server::{build_router, AppState, DEFAULT_MAX_UPLOAD_BYTES};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub const BOUNDARY: &str = "moodtunes-test-boundary";

/// Classifier returning a canned result
pub struct FakeClassifier {
    result: Mutex<Box<dyn Fn() -> Result<AudioFeatures, ExtractionError> + Send>>,
    /// (path, existed at call time)
    pub calls: Mutex<Vec<(PathBuf, bool)>>,
}

impl FakeClassifier {
    pub fn returning(mood: Mood) -> Arc<Self> {
        Self::with(move || {
            Ok(AudioFeatures {
                mood,
                tempo: Some(98.0),
                mean_energy: Some(0.12),
            })
        })
    }

    pub fn failing(reason: &'static str) -> Arc<Self> {
        Self::with(move || Err(ExtractionError::AnalysisFailed(reason.to_string())))
    }

    pub fn with<F>(f: F) -> Arc<Self>
    where
        F: Fn() -> Result<AudioFeatures, ExtractionError> + Send + 'static,
    {
        Arc::new(Self {
            result: Mutex::new(Box::new(f)),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MoodClassifier for FakeClassifier {
    async fn classify(&self, audio_path: &Path) -> Result<AudioFeatures, ExtractionError> {
        self.calls
            .lock()
            .unwrap()
            .push((audio_path.to_path_buf(), audio_path.exists()));
        (self.result.lock().unwrap())()
    }
}

/// Classifier that sleeps before answering, for cancellation tests
pub struct SlowClassifier {
    pub delay: Duration,
    pub started: Mutex<bool>,
}

impl SlowClassifier {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            started: Mutex::new(false),
        })
    }
}

#[async_trait]
impl MoodClassifier for SlowClassifier {
    async fn classify(&self, _audio_path: &Path) -> Result<AudioFeatures, ExtractionError> {
        *self.started.lock().unwrap() = true;
        tokio::time::sleep(self.delay).await;
        Ok(AudioFeatures {
            mood: Mood::Neutral,
            tempo: None,
            mean_energy: None,
        })
    }
}

/// Media store that records uploads and deletes
#[derive(Default)]
pub struct FakeStore {
    fail_upload: Option<fn() -> StorageError>,
    /// Uploads succeed but report no file id
    omit_file_id: bool,
    fail_delete: bool,
    /// (remote file name, uploaded bytes)
    pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
    /// Every delete attempt, failed ones included
    pub deletes: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(make_error: fn() -> StorageError) -> Arc<Self> {
        Arc::new(Self {
            fail_upload: Some(make_error),
            ..Self::default()
        })
    }

    pub fn without_file_id() -> Arc<Self> {
        Arc::new(Self {
            omit_file_id: true,
            ..Self::default()
        })
    }

    pub fn failing_delete() -> Arc<Self> {
        Arc::new(Self {
            fail_delete: true,
            ..Self::default()
        })
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaStore for FakeStore {
    async fn upload(&self, path: &Path, file_name: &str) -> Result<StoredMedia, StorageError> {
        let bytes = tokio::fs::read(path).await?;
        self.uploads
            .lock()
            .unwrap()
            .push((file_name.to_string(), bytes));

        if let Some(make_error) = self.fail_upload {
            return Err(make_error());
        }

        Ok(StoredMedia {
            url: format!("https://ik.imagekit.io/test/MoodyAudios/{}", file_name),
            file_id: (!self.omit_file_id).then(|| format!("file-{}", file_name)),
            name: file_name.to_string(),
        })
    }

    async fn delete(&self, file_id: &str) -> Result<(), StorageError> {
        self.deletes.lock().unwrap().push(file_id.to_string());
        if self.fail_delete {
            return Err(StorageError::ApiError(500, "delete failed".to_string()));
        }
        Ok(())
    }
}

/// Test app plus the handles a test inspects afterwards
pub struct TestApp {
    pub router: axum::Router,
    pub pool: SqlitePool,
    pub staging_dir: TempDir,
}

/// In-memory database with the songs schema
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    moodtunes_server::db::init_tables(&pool)
        .await
        .expect("Failed to initialize schema");
    pool
}

pub async fn create_test_app(
    classifier: Arc<dyn MoodClassifier>,
    store: Arc<dyn MediaStore>,
) -> TestApp {
    create_test_app_with_limit(classifier, store, DEFAULT_MAX_UPLOAD_BYTES).await
}

pub async fn create_test_app_with_limit(
    classifier: Arc<dyn MoodClassifier>,
    store: Arc<dyn MediaStore>,
    max_upload_bytes: usize,
) -> TestApp {
    let pool = memory_pool().await;
    let staging_dir = tempfile::tempdir().expect("Failed to create staging dir");
    let pipeline = UploadPipeline::new(
        StagingArea::new(staging_dir.path()),
        classifier,
        store,
        pool.clone(),
    );
    let router = build_router(
        AppState::new(pool.clone(), pipeline).with_max_upload_bytes(max_upload_bytes),
    );

    TestApp {
        router,
        pool,
        staging_dir,
    }
}

/// One multipart part
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: audio/mpeg\r\n\r\n");
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn upload_request(parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/songs")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn post_request(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(body.into())
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Wait until the directory has no entries, or give up after ~2 s
pub async fn wait_until_empty(dir: &Path) -> bool {
    for _ in 0..40 {
        if std::fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(false) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
