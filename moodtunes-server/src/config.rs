//! Server configuration
//!
//! Resolution order, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use moodtunes_common::config::{default_data_dir, non_blank, LoggingConfig, APP_DIR_NAME};
use moodtunes_common::{Error, Result};
use serde::Deserialize;

use crate::services::media_store::{IMAGEKIT_API_BASE_URL, IMAGEKIT_UPLOAD_URL};
use crate::services::ImageKitCredentials;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_EXTRACTOR_PROGRAM: &str = "python3";
pub const DEFAULT_EXTRACTOR_SCRIPT: &str = "audio-analyser.py";
pub const DEFAULT_EXTRACTOR_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_STORAGE_FOLDER: &str = "MoodyAudios";
pub const DEFAULT_STORAGE_TIMEOUT_SECS: u64 = 60;

pub const EXTRACTOR_PROGRAM_ENV: &str = "MOODTUNES_EXTRACTOR_PROGRAM";
pub const IMAGEKIT_PUBLIC_KEY_ENV: &str = "IMAGEKIT_PUBLIC_KEY";
pub const IMAGEKIT_PRIVATE_KEY_ENV: &str = "IMAGEKIT_PRIVATE_KEY";
pub const IMAGEKIT_URL_ENDPOINT_ENV: &str = "IMAGEKIT_URL_ENDPOINT";

/// Command-line arguments for moodtunes-server
#[derive(Parser, Debug, Default)]
#[command(name = "moodtunes-server")]
#[command(about = "Mood-tagged song library and recommendation service")]
#[command(version)]
pub struct Args {
    /// Path to TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "MOODTUNES_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MOODTUNES_PORT")]
    pub port: Option<u16>,

    /// SQLite database URL
    #[arg(long, env = "MOODTUNES_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Directory for staged uploads
    #[arg(long, env = "MOODTUNES_STAGING_DIR")]
    pub staging_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML config file contents
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub extractor: ExtractorSection,
    pub storage: StorageSection,
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub staging_dir: Option<PathBuf>,
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ExtractorSection {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    pub url_endpoint: Option<String>,
    pub folder: Option<String>,
    pub timeout_secs: Option<u64>,
    pub upload_url: Option<String>,
    pub api_base_url: Option<String>,
}

/// Extractor subprocess settings
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout: Duration,
}

/// Media store settings
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub credentials: ImageKitCredentials,
    pub folder: String,
    pub timeout: Duration,
    pub upload_url: String,
    pub api_base_url: String,
}

/// Fully resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub staging_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub extractor: ExtractorConfig,
    pub storage: StorageConfig,
    pub log_level: String,
}

impl ServerConfig {
    /// Resolve from arguments, the process environment and the TOML file
    pub fn resolve(args: &Args, file: TomlConfig) -> Result<Self> {
        Self::resolve_with(args, file, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit lookup for environment-only settings
    pub fn resolve_with<F>(args: &Args, file: TomlConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let TomlConfig {
            server,
            database,
            extractor,
            storage,
            logging,
        } = file;

        let host = non_blank(args.host.clone())
            .or(server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = args.port.or(server.port).unwrap_or(DEFAULT_PORT);
        let bind_addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address {}:{}: {}", host, port, e)))?;

        let database_url = non_blank(args.database_url.clone())
            .or(non_blank(database.url))
            .unwrap_or_else(default_database_url);

        let staging_dir = args
            .staging_dir
            .clone()
            .or(server.staging_dir)
            .unwrap_or_else(default_staging_dir);

        let max_upload_bytes = server
            .max_upload_bytes
            .unwrap_or(crate::DEFAULT_MAX_UPLOAD_BYTES);
        if max_upload_bytes == 0 {
            return Err(Error::Config("server.max_upload_bytes must be positive".to_string()));
        }

        let extractor = ExtractorConfig {
            program: non_blank(env(EXTRACTOR_PROGRAM_ENV))
                .or(non_blank(extractor.program))
                .unwrap_or_else(|| DEFAULT_EXTRACTOR_PROGRAM.to_string()),
            args: extractor
                .args
                .unwrap_or_else(|| vec![DEFAULT_EXTRACTOR_SCRIPT.to_string()]),
            timeout: Duration::from_secs(
                extractor.timeout_secs.unwrap_or(DEFAULT_EXTRACTOR_TIMEOUT_SECS),
            ),
        };

        let credentials = ImageKitCredentials {
            public_key: required(&env, IMAGEKIT_PUBLIC_KEY_ENV, storage.public_key, "storage.public_key")?,
            private_key: required(&env, IMAGEKIT_PRIVATE_KEY_ENV, storage.private_key, "storage.private_key")?,
            url_endpoint: required(&env, IMAGEKIT_URL_ENDPOINT_ENV, storage.url_endpoint, "storage.url_endpoint")?,
        };

        let storage = StorageConfig {
            credentials,
            folder: non_blank(storage.folder).unwrap_or_else(|| DEFAULT_STORAGE_FOLDER.to_string()),
            timeout: Duration::from_secs(
                storage.timeout_secs.unwrap_or(DEFAULT_STORAGE_TIMEOUT_SECS),
            ),
            upload_url: non_blank(storage.upload_url)
                .unwrap_or_else(|| IMAGEKIT_UPLOAD_URL.to_string()),
            api_base_url: non_blank(storage.api_base_url)
                .unwrap_or_else(|| IMAGEKIT_API_BASE_URL.to_string()),
        };

        let log_level = non_blank(args.log_level.clone()).unwrap_or(logging.level);

        Ok(Self {
            bind_addr,
            database_url,
            staging_dir,
            max_upload_bytes,
            extractor,
            storage,
            log_level,
        })
    }
}

/// Environment first, then the TOML value; blank counts as missing
fn required<F>(env: &F, env_key: &str, file_value: Option<String>, toml_key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    non_blank(env(env_key))
        .or(non_blank(file_value))
        .map(|v| v.trim().to_string())
        .ok_or_else(|| {
            Error::Config(format!(
                "Missing required setting: set {} or {} in the config file",
                env_key, toml_key
            ))
        })
}

/// `sqlite://<data_dir>/moodtunes/moodtunes.db?mode=rwc`
pub fn default_database_url() -> String {
    let path = default_data_dir().join(format!("{}.db", APP_DIR_NAME));
    format!("sqlite://{}?mode=rwc", path.display())
}

pub fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join(format!("{}-uploads", APP_DIR_NAME))
}
