//! Mood vocabulary endpoint
//!
//! Lets a client check that the labels its expression model produces are
//! the ones songs are stored under.

use axum::{routing::get, Json, Router};
use moodtunes_common::Mood;
use serde::Serialize;

use crate::AppState;

/// GET /moods response
#[derive(Debug, Serialize)]
pub struct MoodsResponse {
    /// Full canonical vocabulary
    pub moods: Vec<Mood>,
    /// Labels a client may query songs for
    pub queryable: Vec<Mood>,
}

/// GET /moods
pub async fn list_moods() -> Json<MoodsResponse> {
    Json(MoodsResponse {
        moods: Mood::ALL.to_vec(),
        queryable: Mood::queryable().collect(),
    })
}

/// Build mood vocabulary routes
pub fn mood_routes() -> Router<AppState> {
    Router::new().route("/moods", get(list_moods))
}
