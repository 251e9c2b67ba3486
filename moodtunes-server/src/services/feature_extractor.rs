//! Audio feature extraction via an external analysis script
//!
//! The classifier runs as a separate process per upload:
//! `<program> <args...> <audio_path>`. On success it prints a JSON object
//! with at least a `mood` field to stdout. On failure it exits non-zero and
//! prints either `{"error": "..."}` or free text to stderr.

use async_trait::async_trait;
use moodtunes_common::Mood;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Feature extraction errors
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Extractor program not found in PATH
    #[error("Extractor program not found: {0}")]
    ProgramNotFound(String),

    /// Failed to spawn or wait on the extractor process
    #[error("Failed to execute extractor: {0}")]
    ExecutionError(String),

    /// Extractor ran but reported a failure
    #[error("Audio analysis failed: {0}")]
    AnalysisFailed(String),

    /// Extractor output was not the expected JSON
    #[error("Failed to parse extractor output: {0}")]
    ParseError(String),

    /// Extractor produced a label outside the shared vocabulary
    #[error("Extractor returned unknown mood label {0:?}")]
    UnknownMood(String),

    /// Extractor did not finish in time and was killed
    #[error("Extractor timed out after {0:?}")]
    Timeout(Duration),

    /// Audio file not found at path
    #[error("Audio file not found: {0}")]
    FileNotFound(String),
}

/// Classification result for one audio file
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFeatures {
    pub mood: Mood,
    /// Estimated tempo in BPM, if reported
    pub tempo: Option<f64>,
    /// Mean RMS energy, if reported
    pub mean_energy: Option<f64>,
}

/// Derives a mood label from an audio file
#[async_trait]
pub trait MoodClassifier: Send + Sync {
    async fn classify(&self, audio_path: &Path) -> Result<AudioFeatures, ExtractionError>;
}

/// Extractor stdout payload
#[derive(Debug, Deserialize)]
struct ExtractorOutput {
    mood: Option<String>,
    tempo: Option<f64>,
    mean_energy: Option<f64>,
    error: Option<String>,
}

/// Extractor stderr payload
#[derive(Debug, Deserialize)]
struct ExtractorErrorPayload {
    error: Option<String>,
}

/// Classifier that spawns an analysis script for every file
#[derive(Debug, Clone)]
pub struct ScriptExtractor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ScriptExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Check that the extractor program can be launched
    pub async fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok()
    }
}

#[async_trait]
impl MoodClassifier for ScriptExtractor {
    async fn classify(&self, audio_path: &Path) -> Result<AudioFeatures, ExtractionError> {
        if !audio_path.exists() {
            return Err(ExtractionError::FileNotFound(
                audio_path.display().to_string(),
            ));
        }

        tracing::debug!(
            program = %self.program,
            audio_file = %audio_path.display(),
            "Running feature extractor"
        );

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(audio_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    ExtractionError::ProgramNotFound(self.program.clone())
                }
                _ => ExtractionError::ExecutionError(e.to_string()),
            })?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| ExtractionError::ExecutionError(e.to_string()))?,
            Err(_) => {
                tracing::warn!(
                    audio_file = %audio_path.display(),
                    timeout = ?self.timeout,
                    "Feature extractor timed out, killing process"
                );
                return Err(ExtractionError::Timeout(self.timeout));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::AnalysisFailed(failure_reason(
                &stderr,
                output.status.code(),
            )));
        }

        let features = parse_output(&String::from_utf8_lossy(&output.stdout))?;

        tracing::info!(
            audio_file = %audio_path.display(),
            mood = %features.mood,
            tempo = ?features.tempo,
            mean_energy = ?features.mean_energy,
            "Feature extraction completed"
        );

        Ok(features)
    }
}

/// Parse a successful extractor run's stdout
fn parse_output(stdout: &str) -> Result<AudioFeatures, ExtractionError> {
    let output: ExtractorOutput = parse_json_tail(stdout).ok_or_else(|| {
        ExtractionError::ParseError(format!("expected a JSON object, got {:?}", stdout.trim()))
    })?;

    if let Some(error) = output.error {
        return Err(ExtractionError::AnalysisFailed(error));
    }

    let label = output
        .mood
        .ok_or_else(|| ExtractionError::ParseError("missing `mood` field".to_string()))?;
    let mood = label
        .parse::<Mood>()
        .map_err(|_| ExtractionError::UnknownMood(label.clone()))?;

    Ok(AudioFeatures {
        mood,
        tempo: output.tempo,
        mean_energy: output.mean_energy,
    })
}

/// Failure text for a non-zero exit: stderr `error` field, else raw stderr,
/// else the exit code
fn failure_reason(stderr: &str, code: Option<i32>) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return match code {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        };
    }

    match parse_json_tail::<ExtractorErrorPayload>(trimmed) {
        Some(payload) => payload
            .error
            .unwrap_or_else(|| "unknown extractor error".to_string()),
        None => trimmed.to_string(),
    }
}

/// Parse the whole text as JSON, falling back to its last non-empty line
///
/// Analysis libraries print warnings ahead of the result line.
fn parse_json_tail<T: serde::de::DeserializeOwned>(text: &str) -> Option<T> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Some(value);
    }
    trimmed
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| serde_json::from_str(line.trim()).ok())
}
