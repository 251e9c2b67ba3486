//! Capture flow state machine
//!
//! All capture behaviour goes through [`transition`], a pure function from
//! (state, event) to (next state, effects). The session driver performs the
//! effects and feeds their outcomes back in as events.
//!
//! ```text
//! Idle -> ModelsLoading -> ModelsReady -> CameraRequested -> CameraActive
//!                                                |                |  ^
//!                                                v                v  |
//!                                           CameraError        Detecting
//!                                                                 |
//!                                                                 v
//!                                                            ShowingMood
//! ```

use std::fmt;
use std::time::Duration;

use moodtunes_common::Mood;

use crate::expressions::{resolve_prominent_mood, ExpressionScores};

/// How long short notices stay on screen
pub const NOTICE_TIMEOUT: Duration = Duration::from_secs(3);

/// How long a detected mood stays on screen
pub const MOOD_DISPLAY_TIMEOUT: Duration = Duration::from_secs(5);

/// Camera acquisition failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraErrorKind {
    Denied,
    NotFound,
    InUse,
    Aborted,
    InsecureContext,
    Unknown,
}

impl CameraErrorKind {
    /// Classify a browser media error by its DOMException name
    pub fn from_dom_error_name(name: &str) -> Self {
        match name {
            "NotAllowedError" => CameraErrorKind::Denied,
            "NotFoundError" => CameraErrorKind::NotFound,
            "NotReadableError" => CameraErrorKind::InUse,
            "AbortError" => CameraErrorKind::Aborted,
            "SecurityError" => CameraErrorKind::InsecureContext,
            _ => CameraErrorKind::Unknown,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            CameraErrorKind::Denied => {
                "Camera access denied. Please allow camera permissions in your browser settings."
            }
            CameraErrorKind::NotFound => "No camera found on your device.",
            CameraErrorKind::InUse => "Camera is already in use or inaccessible by the browser.",
            CameraErrorKind::Aborted => "Camera access request was aborted.",
            CameraErrorKind::InsecureContext => {
                "Camera access denied due to security policy (e.g., non-HTTPS or iframe issues)."
            }
            CameraErrorKind::Unknown => "Could not access webcam. Please check permissions.",
        }
    }
}

impl fmt::Display for CameraErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Transient user-facing status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMessage {
    CameraNotActive,
    NoFaceDetected,
    NoMoodResolved,
    ModelsNotLoaded,
    MoodDetected(Mood),
    CameraError(CameraErrorKind),
}

impl StatusMessage {
    /// Auto-dismiss delay
    pub fn timeout(&self) -> Duration {
        match self {
            StatusMessage::MoodDetected(_) => MOOD_DISPLAY_TIMEOUT,
            _ => NOTICE_TIMEOUT,
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusMessage::CameraNotActive => f.write_str("Camera not active or models not loaded."),
            StatusMessage::NoFaceDetected => f.write_str("No face detected for mood analysis."),
            StatusMessage::NoMoodResolved => f.write_str("No clear mood detected."),
            StatusMessage::ModelsNotLoaded => f.write_str("Models not loaded yet."),
            StatusMessage::MoodDetected(mood) => write!(f, "Detected Mood: {}", mood),
            StatusMessage::CameraError(kind) => write!(f, "Error: {}", kind),
        }
    }
}

/// Capture flow state
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    /// No models, no stream
    Idle,
    ModelsLoading,
    /// Model load failed; `Start` retries
    ModelsFailed(String),
    ModelsReady,
    CameraRequested,
    /// Steady state; detection may be triggered
    CameraActive,
    /// Detection running on the current frame
    Detecting,
    /// Mood on display; reverts to `CameraActive` when the display expires
    ShowingMood(Mood),
    CameraError(CameraErrorKind),
}

/// Inputs to the state machine: user actions and effect outcomes
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    Start,
    ModelsLoaded,
    ModelsLoadFailed(String),
    RequestCamera,
    CameraStarted,
    CameraFailed(CameraErrorKind),
    DetectMood,
    /// `None` when no face was found
    DetectionFinished(Option<ExpressionScores>),
    MoodDisplayExpired,
}

/// Work the driver performs after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    LoadModels,
    AcquireCamera,
    RunDetection,
    QuerySongs(Mood),
    ShowStatus(StatusMessage),
}

/// Next state plus the effects to run, in order
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: CaptureState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(state: CaptureState) -> Self {
        Self {
            state,
            effects: Vec::new(),
        }
    }

    fn with(state: CaptureState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }

    fn stay(state: &CaptureState) -> Self {
        Self::to(state.clone())
    }

    fn notify(state: &CaptureState, message: StatusMessage) -> Self {
        Self::with(state.clone(), vec![Effect::ShowStatus(message)])
    }
}

/// Apply one event
///
/// Events that make no sense in the current state leave it unchanged, at
/// most with a status notice.
pub fn transition(state: &CaptureState, event: CaptureEvent) -> Transition {
    use CaptureEvent as E;
    use CaptureState as S;

    match (state, event) {
        (S::Idle | S::ModelsFailed(_), E::Start) => {
            Transition::with(S::ModelsLoading, vec![Effect::LoadModels])
        }
        (_, E::Start) => Transition::stay(state),

        (S::ModelsLoading, E::ModelsLoaded) => Transition::to(S::ModelsReady),
        (S::ModelsLoading, E::ModelsLoadFailed(reason)) => Transition::to(S::ModelsFailed(reason)),

        (S::ModelsReady | S::CameraError(_), E::RequestCamera) => {
            Transition::with(S::CameraRequested, vec![Effect::AcquireCamera])
        }
        (S::Idle | S::ModelsLoading | S::ModelsFailed(_), E::RequestCamera) => {
            Transition::notify(state, StatusMessage::ModelsNotLoaded)
        }

        (S::CameraRequested, E::CameraStarted) => Transition::to(S::CameraActive),
        (S::CameraRequested, E::CameraFailed(kind)) => Transition::with(
            S::CameraError(kind),
            vec![Effect::ShowStatus(StatusMessage::CameraError(kind))],
        ),

        (S::CameraActive | S::ShowingMood(_), E::DetectMood) => {
            Transition::with(S::Detecting, vec![Effect::RunDetection])
        }
        (S::Detecting, E::DetectMood) => Transition::stay(state),
        (_, E::DetectMood) => Transition::notify(state, StatusMessage::CameraNotActive),

        (S::Detecting, E::DetectionFinished(None)) => Transition::with(
            S::CameraActive,
            vec![Effect::ShowStatus(StatusMessage::NoFaceDetected)],
        ),
        (S::Detecting, E::DetectionFinished(Some(scores))) => {
            match resolve_prominent_mood(&scores) {
                Some(mood) => Transition::with(
                    S::ShowingMood(mood),
                    vec![
                        Effect::ShowStatus(StatusMessage::MoodDetected(mood)),
                        Effect::QuerySongs(mood),
                    ],
                ),
                None => Transition::with(
                    S::CameraActive,
                    vec![Effect::ShowStatus(StatusMessage::NoMoodResolved)],
                ),
            }
        }

        (S::ShowingMood(_), E::MoodDisplayExpired) => Transition::to(S::CameraActive),

        (_, event) => {
            tracing::debug!(state = ?state, event = ?event, "Ignoring event");
            Transition::stay(state)
        }
    }
}
