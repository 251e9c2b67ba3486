//! mood-probe - resolve a mood from expression scores and fetch songs
//!
//! Usage:
//!   mood-probe '{"happy": 0.9, "sad": 0.1, "surprised": 0.99}'
//!   mood-probe --file scores.json --query
//!   mood-probe --check-vocabulary --server http://127.0.0.1:3000

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use moodtunes_client::recommend::{DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_URL};
use moodtunes_client::{resolve_prominent_mood, ExpressionScores, RecommendationClient};
use moodtunes_common::config::{load_config_or_default, CONFIG_ENV_VAR};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for mood-probe
#[derive(Parser, Debug)]
#[command(name = "mood-probe")]
#[command(about = "Resolve a mood from facial-expression scores and query songs for it")]
#[command(version)]
struct Args {
    /// Expression scores as a JSON object ("-" reads stdin)
    scores: Option<String>,

    /// Read expression scores from a file
    #[arg(short, long, conflicts_with = "scores")]
    file: Option<PathBuf>,

    /// Query the server for songs matching the resolved mood
    #[arg(short, long)]
    query: bool,

    /// Compare the server's mood vocabulary with this client's
    #[arg(long)]
    check_vocabulary: bool,

    /// Server base URL
    #[arg(short, long, env = "MOODTUNES_SERVER_URL")]
    server: Option<String>,

    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProbeConfig {
    client: ClientSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClientSection {
    server_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config: ProbeConfig = load_config_or_default(args.config.as_deref(), CONFIG_ENV_VAR)?;
    let server_url = args
        .server
        .clone()
        .or(config.client.server_url)
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
    let timeout = config
        .client
        .request_timeout_secs
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

    let client = RecommendationClient::with_timeout(&server_url, timeout)?;

    if args.check_vocabulary {
        let vocabulary = client
            .vocabulary()
            .await
            .with_context(|| format!("Failed to fetch vocabulary from {}", server_url))?;
        let missing = vocabulary.missing_from_server();
        if missing.is_empty() {
            println!("Vocabulary matches: {}", vocabulary.queryable.join(", "));
        } else {
            let labels: Vec<&str> = missing.iter().map(|m| m.as_str()).collect();
            println!("Server is missing queryable moods: {}", labels.join(", "));
        }
    }

    let raw = match (&args.scores, &args.file) {
        (Some(s), _) if s == "-" => std::io::read_to_string(std::io::stdin())
            .context("Failed to read scores from stdin")?,
        (Some(s), _) => s.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) if args.check_vocabulary => return Ok(()),
        (None, None) => bail!("No expression scores given (pass JSON, --file, or -)"),
    };

    let scores: ExpressionScores =
        serde_json::from_str(&raw).context("Expression scores must be a JSON object of numbers")?;

    let Some(mood) = resolve_prominent_mood(&scores) else {
        println!("No mood resolved");
        return Ok(());
    };
    println!("Resolved mood: {}", mood);

    if args.query {
        let songs = client
            .songs_for_mood(mood)
            .await
            .with_context(|| format!("Song query to {} failed", server_url))?;
        if songs.is_empty() {
            println!("No songs for {}", mood);
        }
        for song in songs {
            println!("{} by {}: {}", song.title, song.artist, song.audio_url);
        }
    }

    Ok(())
}
