//! # MoodTunes Common Library
//!
//! Shared code for the MoodTunes server and client including:
//! - The canonical mood vocabulary shared by both analyzers
//! - The persisted `Song` model
//! - Configuration file loading
//! - Common error type

pub mod config;
pub mod error;
pub mod models;
pub mod mood;

pub use error::{Error, Result};
pub use models::Song;
pub use mood::Mood;
