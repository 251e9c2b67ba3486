//! moodtunes-client
//!
//! Client-side mood resolution and recommendation fetching: picks the
//! prominent mood from facial-expression scores, drives the capture flow
//! as an explicit state machine, and queries the server for songs.

pub mod capture;
pub mod error;
pub mod expressions;
pub mod recommend;
pub mod session;

pub use capture::{transition, CameraErrorKind, CaptureEvent, CaptureState, Effect, StatusMessage, Transition};
pub use error::{ClientError, Result};
pub use expressions::{resolve_prominent_mood, ExpressionScores};
pub use recommend::RecommendationClient;
pub use session::{Camera, CaptureSession, ExpressionDetector, SongQuery};
