use std::{path::PathBuf, str::FromStr};

use anyhow::Context;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://pairchat.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_BLOB_DIR: &str = "blobs";
pub const DEFAULT_SESSION_MINUTES: i64 = 60;

/// Startup settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub blob_dir: PathBuf,
    /// When set, accounts live in Firebase; otherwise in the local database.
    pub firebase_api_key: Option<String>,
    pub session_minutes: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let session_minutes = match lookup("SESSION_MINUTES") {
            Some(raw) => i64::from_str(&raw)
                .with_context(|| format!("SESSION_MINUTES must be a number, got {raw:?}"))?,
            None => DEFAULT_SESSION_MINUTES,
        };
        if session_minutes <= 0 {
            anyhow::bail!("SESSION_MINUTES must be positive");
        }

        Ok(Config {
            database_url: var("DATABASE_URL", DEFAULT_DATABASE_URL),
            bind_addr: var("BIND_ADDR", DEFAULT_BIND_ADDR),
            blob_dir: PathBuf::from(var("BLOB_DIR", DEFAULT_BLOB_DIR)),
            firebase_api_key: lookup("FIREBASE_API_KEY").filter(|key| !key.trim().is_empty()),
            session_minutes,
        })
    }
}
