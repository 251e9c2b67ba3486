//! Tests for the script-based feature extractor
//!
//! Each test writes a small shell script standing in for the analysis
//! script and runs it through `sh`.

#![cfg(unix)]

use moodtunes_common::Mood;
use moodtunes_server::services::{ExtractionError, MoodClassifier, ScriptExtractor};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct Fixture {
    dir: TempDir,
    audio: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let audio = dir.path().join("track.mp3");
    std::fs::write(&audio, b"fake audio").unwrap();
    Fixture { dir, audio }
}

fn extractor_for(fixture: &Fixture, script: &str, timeout: Duration) -> ScriptExtractor {
    let script_path = fixture.dir.path().join("analyser.sh");
    std::fs::write(&script_path, script).unwrap();
    ScriptExtractor::new(
        "sh",
        vec![script_path.to_string_lossy().to_string()],
        timeout,
    )
}

#[tokio::test]
async fn test_successful_classification() {
    let fx = fixture();
    let extractor = extractor_for(
        &fx,
        r#"echo '{"tempo": 123.05, "mean_energy": 0.21, "mood": "happy"}'"#,
        Duration::from_secs(10),
    );

    let features = extractor.classify(&fx.audio).await.unwrap();
    assert_eq!(features.mood, Mood::Happy);
    assert_eq!(features.tempo, Some(123.05));
    assert_eq!(features.mean_energy, Some(0.21));
}

#[tokio::test]
async fn test_audio_path_passed_as_last_argument() {
    let fx = fixture();
    // Echo back the mood only if the argument is the audio file
    let extractor = extractor_for(
        &fx,
        r#"if [ -f "$1" ]; then echo '{"mood": "sad"}'; else exit 3; fi"#,
        Duration::from_secs(10),
    );

    let features = extractor.classify(&fx.audio).await.unwrap();
    assert_eq!(features.mood, Mood::Sad);
}

#[tokio::test]
async fn test_label_is_canonicalised() {
    let fx = fixture();
    let extractor = extractor_for(&fx, r#"echo '{"mood": " Angry "}'"#, Duration::from_secs(10));

    let features = extractor.classify(&fx.audio).await.unwrap();
    assert_eq!(features.mood, Mood::Angry);
}

#[tokio::test]
async fn test_stderr_json_error_reported() {
    let fx = fixture();
    let extractor = extractor_for(
        &fx,
        r#"echo '{"error": "Could not decode audio"}' >&2; exit 1"#,
        Duration::from_secs(10),
    );

    match extractor.classify(&fx.audio).await {
        Err(ExtractionError::AnalysisFailed(msg)) => assert_eq!(msg, "Could not decode audio"),
        other => panic!("expected AnalysisFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_plain_stderr_reported() {
    let fx = fixture();
    let extractor = extractor_for(
        &fx,
        "echo 'Traceback: boom' >&2; exit 1",
        Duration::from_secs(10),
    );

    match extractor.classify(&fx.audio).await {
        Err(ExtractionError::AnalysisFailed(msg)) => assert!(msg.contains("Traceback: boom")),
        other => panic!("expected AnalysisFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_silent_failure_reports_exit_code() {
    let fx = fixture();
    let extractor = extractor_for(&fx, "exit 7", Duration::from_secs(10));

    match extractor.classify(&fx.audio).await {
        Err(ExtractionError::AnalysisFailed(msg)) => assert_eq!(msg, "exited with code 7"),
        other => panic!("expected AnalysisFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_label_rejected() {
    let fx = fixture();
    let extractor = extractor_for(&fx, r#"echo '{"mood": "ecstatic"}'"#, Duration::from_secs(10));

    match extractor.classify(&fx.audio).await {
        Err(ExtractionError::UnknownMood(label)) => assert_eq!(label, "ecstatic"),
        other => panic!("expected UnknownMood, got {:?}", other),
    }
}

#[tokio::test]
async fn test_non_json_stdout_rejected() {
    let fx = fixture();
    let extractor = extractor_for(&fx, "echo 'happy'", Duration::from_secs(10));

    assert!(matches!(
        extractor.classify(&fx.audio).await,
        Err(ExtractionError::ParseError(_))
    ));
}

#[tokio::test]
async fn test_timeout_kills_extractor() {
    let fx = fixture();
    let extractor = extractor_for(&fx, "sleep 30", Duration::from_millis(200));

    let started = Instant::now();
    let result = extractor.classify(&fx.audio).await;

    assert!(matches!(result, Err(ExtractionError::Timeout(_))));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_missing_program() {
    let fx = fixture();
    let extractor = ScriptExtractor::new(
        "moodtunes-no-such-analyser",
        Vec::new(),
        Duration::from_secs(10),
    );

    assert!(!extractor.is_available().await);
    assert!(matches!(
        extractor.classify(&fx.audio).await,
        Err(ExtractionError::ProgramNotFound(_))
    ));
}

#[tokio::test]
async fn test_missing_audio_file() {
    let fx = fixture();
    let extractor = extractor_for(&fx, r#"echo '{"mood": "happy"}'"#, Duration::from_secs(10));

    assert!(matches!(
        extractor.classify(&fx.dir.path().join("missing.mp3")).await,
        Err(ExtractionError::FileNotFound(_))
    ));
}
