//! HTTP API handlers for moodtunes-server

pub mod health;
pub mod moods;
pub mod songs;

pub use health::health_routes;
pub use moods::mood_routes;
pub use songs::song_routes;
