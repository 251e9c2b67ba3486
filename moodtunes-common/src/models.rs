//! Song model shared by the server (persistence, responses) and the client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A song record as stored and served
///
/// `audio_url` and `mood` are written once at creation and never change.
/// `mood` is kept as text; server-created songs always carry a canonical
/// [`crate::Mood`] label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    #[serde(rename = "audioURL")]
    pub audio_url: String,
    pub mood: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}
