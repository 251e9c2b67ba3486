//! HTTP client for the recommendation server

use std::time::Duration;

use async_trait::async_trait;
use moodtunes_common::{Mood, Song};
use serde::Deserialize;

use crate::error::{ClientError, Result};
use crate::session::SongQuery;

/// Default server base URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Default request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// GET /songs response
#[derive(Debug, Deserialize)]
struct SongListResponse {
    /// Older servers answer with `song`
    #[serde(alias = "song", default)]
    songs: Vec<Song>,
}

/// GET /moods response
#[derive(Debug, Clone, Deserialize)]
pub struct Vocabulary {
    pub moods: Vec<String>,
    pub queryable: Vec<String>,
}

impl Vocabulary {
    /// Local labels the server does not list as queryable
    pub fn missing_from_server(&self) -> Vec<Mood> {
        Mood::queryable()
            .filter(|m| !self.queryable.iter().any(|q| q == m.as_str()))
            .collect()
    }
}

/// Recommendation API client
#[derive(Debug, Clone)]
pub struct RecommendationClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl RecommendationClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /songs?mood=<label>
    pub async fn songs_for_mood(&self, mood: Mood) -> Result<Vec<Song>> {
        let url = format!("{}/songs", self.base_url);
        tracing::debug!(url = %url, mood = %mood, "Querying songs");

        let response = self
            .http_client
            .get(&url)
            .query(&[("mood", mood.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status(status.as_u16(), body));
        }

        let list: SongListResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        tracing::info!(mood = %mood, count = list.songs.len(), "Songs fetched");
        Ok(list.songs)
    }

    /// GET /moods
    pub async fn vocabulary(&self) -> Result<Vocabulary> {
        let response = self
            .http_client
            .get(format!("{}/moods", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}

#[async_trait]
impl SongQuery for RecommendationClient {
    async fn songs_for_mood(&self, mood: Mood) -> Result<Vec<Song>> {
        RecommendationClient::songs_for_mood(self, mood).await
    }
}
